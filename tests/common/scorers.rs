//! Deterministic scorers for pipeline tests

use async_trait::async_trait;
use ontoscope::{
    CancellationToken, ConceptId, Paper, RelevanceJudgment, RelevanceLevel, RelevanceScorer,
    RetrievalContext, ScoreError, ScoreScale,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scores by lexical overlap instead of asking a model:
/// - target label or synonym in the paper: highly relevant
/// - another context concept in the paper: weakly relevant
/// - otherwise: not relevant
#[derive(Default)]
pub struct LexicalScorer {
    scale: ScoreScale,
    delays: HashMap<ConceptId, Duration>,
    calls: AtomicUsize,
}

impl LexicalScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay scoring of one concept, to shuffle completion order.
    pub fn with_delay(mut self, concept: &str, delay: Duration) -> Self {
        self.delays.insert(ConceptId::from(concept), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceScorer for LexicalScorer {
    async fn score(
        &self,
        paper: &Paper,
        context: &RetrievalContext,
    ) -> Result<RelevanceJudgment, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&context.target.id) {
            tokio::time::sleep(*delay).await;
        }

        let text = paper.full_text();
        let level = if context.target.is_mentioned_in(&text) {
            RelevanceLevel::HighlyRelevant
        } else if context.concepts[1..].iter().any(|c| c.is_mentioned_in(&text)) {
            RelevanceLevel::WeaklyRelevant
        } else {
            RelevanceLevel::NotRelevant
        };

        Ok(RelevanceJudgment::scored(
            paper,
            context,
            level,
            &self.scale,
            Some(format!("lexical overlap with {}", context.target.display_label())),
        ))
    }
}

/// Wraps a scorer and cancels a token once `after` calls have completed.
pub struct CancellingScorer<S> {
    inner: S,
    token: CancellationToken,
    after: usize,
    calls: AtomicUsize,
}

impl<S> CancellingScorer<S> {
    pub fn new(inner: S, token: CancellationToken, after: usize) -> Self {
        Self {
            inner,
            token,
            after,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<S: RelevanceScorer> RelevanceScorer for CancellingScorer<S> {
    async fn score(
        &self,
        paper: &Paper,
        context: &RetrievalContext,
    ) -> Result<RelevanceJudgment, ScoreError> {
        let result = self.inner.score(paper, context).await;
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.token.cancel();
        }
        result
    }
}
