//! Language-model-backed scorer

use super::parse::parse_response;
use super::prompt::build_prompt;
use super::scale::ScoreScale;
use super::{RelevanceJudgment, RelevanceScorer, RetrievalContext, ScoreError};
use crate::llm::LanguageModel;
use crate::paper::Paper;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Default abstract budget for prompts, in words
pub const DEFAULT_EXCERPT_WORDS: usize = 400;

/// Scores with exactly one model call per judgment.
pub struct LlmScorer {
    model: Arc<dyn LanguageModel>,
    scale: ScoreScale,
    max_excerpt_words: usize,
    call_timeout: Option<Duration>,
}

impl LlmScorer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            scale: ScoreScale::default(),
            max_excerpt_words: DEFAULT_EXCERPT_WORDS,
            call_timeout: None,
        }
    }

    pub fn with_scale(mut self, scale: ScoreScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_excerpt_words(mut self, words: usize) -> Self {
        self.max_excerpt_words = words;
        self
    }

    /// Bound each model call when scoring outside a pipeline. Pipelines
    /// bound every attempt through their retry policy instead.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    pub fn scale(&self) -> &ScoreScale {
        &self.scale
    }
}

#[async_trait]
impl RelevanceScorer for LlmScorer {
    async fn score(
        &self,
        paper: &Paper,
        context: &RetrievalContext,
    ) -> Result<RelevanceJudgment, ScoreError> {
        let prompt = build_prompt(paper, context, self.max_excerpt_words);

        let response = match self.call_timeout {
            Some(limit) => timeout(limit, self.model.complete(&prompt))
                .await
                .map_err(|_| ScoreError::Timeout {
                    seconds: limit.as_secs_f64(),
                })??,
            None => self.model.complete(&prompt).await?,
        };

        let parsed = parse_response(&response, &self.scale).map_err(ScoreError::Parse)?;
        debug!(
            paper = %paper.id,
            concept = %context.target.id,
            level = %parsed.level,
            "scored"
        );

        Ok(RelevanceJudgment::scored(
            paper,
            context,
            parsed.level,
            &self.scale,
            parsed.rationale,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Concept;
    use crate::llm::MockModel;
    use crate::scoring::RelevanceLevel;

    fn inputs() -> (Paper, RetrievalContext) {
        (
            Paper::new("p1", "Influenza vaccination", "We model influenza vaccine uptake."),
            RetrievalContext::new(
                Concept::new("B", "influenza"),
                vec![Concept::new("A", "infectious disease")],
            ),
        )
    }

    #[tokio::test]
    async fn one_model_call_per_score() {
        let model = Arc::new(MockModel::fixed(
            r#"{"relevance": "highly relevant", "rationale": "About influenza."}"#,
        ));
        let scorer = LlmScorer::new(model.clone());
        let (paper, context) = inputs();

        let judgment = scorer.score(&paper, &context).await.unwrap();
        assert_eq!(model.calls(), 1);
        assert_eq!(judgment.level(), Some(RelevanceLevel::HighlyRelevant));
        assert_eq!(judgment.score(), Some(1.0));
        assert_eq!(judgment.rationale.as_deref(), Some("About influenza."));
        assert_eq!(judgment.context.len(), 2);
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_scores() {
        let model = Arc::new(MockModel::fixed("Relevance: weakly relevant"));
        let scorer = LlmScorer::new(model.clone());
        let (paper, context) = inputs();

        let first = scorer.score(&paper, &context).await.unwrap();
        let second = scorer.score(&paper, &context).await.unwrap();
        assert_eq!(first, second);
        let prompts = model.prompts();
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test]
    async fn unparsable_response_is_parse_error() {
        let scorer = LlmScorer::new(Arc::new(MockModel::fixed("no idea")));
        let (paper, context) = inputs();
        let err = scorer.score(&paper, &context).await.unwrap_err();
        assert!(matches!(err, ScoreError::Parse(_)));
    }

    #[tokio::test]
    async fn model_failure_is_model_error() {
        let scorer = LlmScorer::new(Arc::new(MockModel::unavailable()));
        let (paper, context) = inputs();
        let err = scorer.score(&paper, &context).await.unwrap_err();
        assert!(matches!(err, ScoreError::Model(_)));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let model = MockModel::fixed("Relevance: relevant").with_delay(Duration::from_millis(200));
        let scorer = LlmScorer::new(Arc::new(model)).with_timeout(Duration::from_millis(20));
        let (paper, context) = inputs();
        let err = scorer.score(&paper, &context).await.unwrap_err();
        assert!(matches!(err, ScoreError::Timeout { .. }));
    }

    #[tokio::test]
    async fn custom_scale_applies() {
        let scale = ScoreScale {
            not_relevant: 0.0,
            weakly_relevant: 0.25,
            relevant: 0.5,
            highly_relevant: 0.75,
        };
        let scorer = LlmScorer::new(Arc::new(MockModel::fixed(r#"{"relevance": "relevant"}"#)))
            .with_scale(scale);
        let (paper, context) = inputs();
        let judgment = scorer.score(&paper, &context).await.unwrap();
        assert_eq!(judgment.score(), Some(0.5));
    }
}
