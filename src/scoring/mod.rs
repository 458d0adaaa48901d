//! Relevance scoring of (paper, concept) pairs
//!
//! A scorer receives a paper and a retrieval context (the concept being
//! judged plus its graph neighborhood, most specific first) and returns one
//! `RelevanceJudgment`. `LlmScorer` does this with a single language model
//! call and strict response parsing.

mod parse;
mod prompt;
mod scale;
mod scorer;

pub use parse::{parse_response, ParsedResponse};
pub use prompt::build_prompt;
pub use scale::{RelevanceLevel, ScoreScale};
pub use scorer::{LlmScorer, DEFAULT_EXCERPT_WORDS};

use crate::graph::{Concept, ConceptId};
use crate::llm::LlmError;
use crate::paper::{Paper, PaperId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors from a single scoring call. All of them are retryable.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("unparsable model response: {0}")]
    Parse(String),
    #[error("model error: {0}")]
    Model(#[from] LlmError),
    #[error("scoring timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },
}

/// The concepts presented to the scorer for one judgment.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalContext {
    /// Concept being judged
    pub target: Concept,
    /// Target first, then its neighbors ordered most specific first
    pub concepts: Vec<Concept>,
}

impl RetrievalContext {
    pub fn new(target: Concept, neighbors: impl IntoIterator<Item = Concept>) -> Self {
        let mut concepts = vec![target.clone()];
        concepts.extend(neighbors.into_iter().filter(|c| c.id != target.id));
        Self { target, concepts }
    }

    /// Ids of the context concepts, in prompt order
    pub fn ids(&self) -> Vec<ConceptId> {
        self.concepts.iter().map(|c| c.id.clone()).collect()
    }
}

/// Whether a judgment produced a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum JudgmentOutcome {
    Scored { level: RelevanceLevel, score: f64 },
    /// Retries were exhausted without a usable response
    Unscored { reason: String },
}

/// Relevance of one paper to one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceJudgment {
    pub paper_id: PaperId,
    pub concept_id: ConceptId,
    pub concept_label: String,
    pub outcome: JudgmentOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Context concept ids, in the order they were presented
    #[serde(default)]
    pub context: Vec<ConceptId>,
    /// Scoring calls made for this judgment
    pub attempts: u32,
}

impl RelevanceJudgment {
    pub fn scored(
        paper: &Paper,
        context: &RetrievalContext,
        level: RelevanceLevel,
        scale: &ScoreScale,
        rationale: Option<String>,
    ) -> Self {
        Self {
            paper_id: paper.id.clone(),
            concept_id: context.target.id.clone(),
            concept_label: context.target.display_label().to_string(),
            outcome: JudgmentOutcome::Scored {
                level,
                score: scale.score(level),
            },
            rationale,
            context: context.ids(),
            attempts: 1,
        }
    }

    pub fn unscored(
        paper: &Paper,
        context: &RetrievalContext,
        reason: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            paper_id: paper.id.clone(),
            concept_id: context.target.id.clone(),
            concept_label: context.target.display_label().to_string(),
            outcome: JudgmentOutcome::Unscored {
                reason: reason.into(),
            },
            rationale: None,
            context: context.ids(),
            attempts,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            JudgmentOutcome::Scored { score, .. } => Some(score),
            JudgmentOutcome::Unscored { .. } => None,
        }
    }

    pub fn level(&self) -> Option<RelevanceLevel> {
        match self.outcome {
            JudgmentOutcome::Scored { level, .. } => Some(level),
            JudgmentOutcome::Unscored { .. } => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.score().is_some()
    }
}

/// Scores a paper against a retrieval context.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(
        &self,
        paper: &Paper,
        context: &RetrievalContext,
    ) -> Result<RelevanceJudgment, ScoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RetrievalContext {
        RetrievalContext::new(
            Concept::new("B", "influenza"),
            vec![Concept::new("B", "influenza"), Concept::new("A", "disease")],
        )
    }

    #[test]
    fn context_puts_target_first_without_duplicates() {
        assert_eq!(
            context().ids(),
            vec![ConceptId::from("B"), ConceptId::from("A")]
        );
    }

    #[test]
    fn scored_judgment_uses_scale() {
        let paper = Paper::new("1", "t", "a");
        let judgment = RelevanceJudgment::scored(
            &paper,
            &context(),
            RelevanceLevel::Relevant,
            &ScoreScale::default(),
            None,
        );
        assert_eq!(judgment.score(), Some(0.67));
        assert_eq!(judgment.concept_label, "influenza");
        assert!(judgment.is_scored());
    }

    #[test]
    fn unscored_judgment_serializes_state() {
        let paper = Paper::new("1", "t", "a");
        let judgment = RelevanceJudgment::unscored(&paper, &context(), "unparsable", 3);
        let json = serde_json::to_value(&judgment).unwrap();
        assert_eq!(json["outcome"]["state"], "unscored");
        assert_eq!(json["outcome"]["reason"], "unparsable");
        assert_eq!(json["attempts"], 3);
        assert!(judgment.score().is_none());
    }
}
