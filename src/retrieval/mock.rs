//! Mock paper source for testing: preconfigured papers and
//! scripted failures.

use super::{PaperSource, RetrievalError};
use crate::graph::{Concept, ConceptId};
use crate::paper::{Paper, PaperId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A scripted failure: the first `remaining` fetches fail with `error`.
/// `None` means fail forever.
#[derive(Debug, Clone)]
struct FailureScript {
    remaining: Option<usize>,
    error: RetrievalError,
}

/// Mock source that counts fetch attempts per paper.
#[derive(Debug, Default)]
pub struct MockPaperSource {
    papers: HashMap<PaperId, Paper>,
    candidates: HashMap<ConceptId, Vec<PaperId>>,
    failures: Mutex<HashMap<PaperId, FailureScript>>,
    attempts: Mutex<HashMap<PaperId, usize>>,
    delay: Option<Duration>,
}

impl MockPaperSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a paper.
    pub fn with_paper(mut self, paper: Paper) -> Self {
        self.papers.insert(paper.id.clone(), paper);
        self
    }

    /// Register the candidate papers returned for a concept.
    pub fn with_candidates(
        mut self,
        concept: impl Into<ConceptId>,
        papers: impl IntoIterator<Item = PaperId>,
    ) -> Self {
        self.candidates
            .insert(concept.into(), papers.into_iter().collect());
        self
    }

    /// Fail the first `times` fetches of a paper, then serve it normally.
    pub fn failing_times(self, id: impl Into<PaperId>, times: usize, error: RetrievalError) -> Self {
        self.script(id.into(), Some(times), error)
    }

    /// Fail every fetch of a paper.
    pub fn always_failing(self, id: impl Into<PaperId>, error: RetrievalError) -> Self {
        self.script(id.into(), None, error)
    }

    /// Sleep before answering each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn script(self, id: PaperId, remaining: Option<usize>, error: RetrievalError) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(id, FailureScript { remaining, error });
        }
        self
    }

    /// How many times `fetch` was called for a paper.
    pub fn attempts(&self, id: &PaperId) -> usize {
        self.attempts
            .lock()
            .map(|a| a.get(id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn scripted_failure(&self, id: &PaperId) -> Option<RetrievalError> {
        let mut failures = self.failures.lock().ok()?;
        let script = failures.get_mut(id)?;
        match script.remaining.as_mut() {
            None => Some(script.error.clone()),
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(script.error.clone())
            }
        }
    }
}

#[async_trait]
impl PaperSource for MockPaperSource {
    async fn fetch(&self, id: &PaperId) -> Result<Paper, RetrievalError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            *attempts.entry(id.clone()).or_insert(0) += 1;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.scripted_failure(id) {
            return Err(error);
        }
        self.papers
            .get(id)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(id.clone()))
    }

    async fn candidates(&self, concept: &Concept) -> Result<Vec<PaperId>, RetrievalError> {
        Ok(self.candidates.get(&concept.id).cloned().unwrap_or_default())
    }
}
