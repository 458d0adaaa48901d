//! The GraphRAG assessment pipeline
//!
//! Per paper: fetch, select concepts, build a retrieval context per concept
//! from the graph neighborhood, score each (paper, concept) pair, and
//! aggregate the judgments into an `AssessmentReport`.

use super::cancel::CancellationToken;
use super::config::{ConceptSelection, ConfigError, PipelineConfig};
use super::report::AssessmentReport;
use super::retry::{with_retry, RetryPolicy};
use crate::graph::{ConceptGraph, ConceptId, GraphError, GraphResult};
use crate::llm::LanguageModel;
use crate::paper::{Paper, PaperId};
use crate::retrieval::{PaperSource, RetrievalError};
use crate::scoring::{
    LlmScorer, RelevanceJudgment, RelevanceScorer, RetrievalContext, ScoreError,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors raised while constructing a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Where a paper's assessment currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ConceptSelection,
    ContextBuilding,
    Scoring { index: usize, total: usize },
    Aggregation,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Init => write!(f, "init"),
            Stage::ConceptSelection => write!(f, "concept-selection"),
            Stage::ContextBuilding => write!(f, "context-building"),
            Stage::Scoring { index, total } => write!(f, "scoring {}/{}", index + 1, total),
            Stage::Aggregation => write!(f, "aggregation"),
            Stage::Done => write!(f, "done"),
        }
    }
}

fn enter(paper: &PaperId, stage: Stage) {
    debug!(paper = %paper, stage = %stage, "pipeline stage");
}

/// Score one context, retrying failures. Never fails: exhausted retries
/// produce an unscored judgment.
async fn score_with_retry(
    scorer: &dyn RelevanceScorer,
    retry: &RetryPolicy,
    paper: &Paper,
    context: &RetrievalContext,
) -> RelevanceJudgment {
    let what = format!("scoring {} against {}", paper.id, context.target.id);
    let outcome = with_retry(
        retry,
        &what,
        || scorer.score(paper, context),
        |_: &ScoreError| true,
        |seconds| ScoreError::Timeout { seconds },
    )
    .await;

    match outcome.result {
        Ok(mut judgment) => {
            judgment.attempts = outcome.attempts;
            judgment
        }
        Err(e) => {
            warn!(
                paper = %paper.id,
                concept = %context.target.id,
                attempts = outcome.attempts,
                "concept left unscored: {}", e
            );
            RelevanceJudgment::unscored(paper, context, e.to_string(), outcome.attempts)
        }
    }
}

/// Orchestrates concept selection, retrieval context and scoring.
///
/// The graph is shared read-only; one pipeline can assess many papers.
pub struct GraphRagPipeline {
    graph: Arc<ConceptGraph>,
    source: Arc<dyn PaperSource>,
    scorer: Arc<dyn RelevanceScorer>,
    config: PipelineConfig,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl GraphRagPipeline {
    /// Validates the config and checks that every seed concept exists.
    pub fn new(
        graph: Arc<ConceptGraph>,
        source: Arc<dyn PaperSource>,
        scorer: Arc<dyn RelevanceScorer>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if let ConceptSelection::Seeds { seeds, .. } = &config.concept_selection {
            for seed in seeds {
                graph.get(seed)?;
            }
        }

        Ok(Self {
            graph,
            source,
            scorer,
            retry: RetryPolicy::from_config(&config),
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Pipeline scoring through `model` with the config's scale and excerpt
    /// budget. Each scoring attempt is bounded by the retry policy's timeout.
    pub fn with_model(
        graph: Arc<ConceptGraph>,
        source: Arc<dyn PaperSource>,
        model: Arc<dyn LanguageModel>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let scorer = LlmScorer::new(model)
            .with_scale(config.score_scale)
            .with_excerpt_words(config.max_excerpt_words);
        Self::new(graph, source, Arc::new(scorer), config)
    }

    /// Replace the cancellation token; cancel a clone to stop the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    /// Candidate papers for the given concepts, de-duplicated in first-seen
    /// order. Concepts whose lookup keeps failing are skipped.
    pub async fn discover_papers(
        &self,
        concept_ids: &[ConceptId],
    ) -> Result<Vec<PaperId>, PipelineError> {
        let mut seen = BTreeSet::new();
        let mut papers = Vec::new();

        for id in concept_ids {
            let concept = self.graph.get(id)?;
            let what = format!("candidate lookup for {}", id);
            let outcome = with_retry(
                &self.retry,
                &what,
                || self.source.candidates(concept),
                RetrievalError::is_retryable,
                |seconds| RetrievalError::Timeout { seconds },
            )
            .await;

            match outcome.result {
                Ok(ids) => {
                    debug!(concept = %id, candidates = ids.len(), "candidates found");
                    papers.extend(ids.into_iter().filter(|p| seen.insert(p.clone())));
                }
                Err(e) => warn!(concept = %id, "skipping concept, candidate lookup failed: {}", e),
            }
        }

        Ok(papers)
    }

    /// Assess each paper in turn under one run id.
    pub async fn run(&self, paper_ids: &[PaperId]) -> Vec<AssessmentReport> {
        let run_id = Uuid::new_v4();
        info!(run = %run_id, papers = paper_ids.len(), "starting assessment run");

        let mut reports = Vec::with_capacity(paper_ids.len());
        for paper_id in paper_ids {
            if self.cancel.is_cancelled() {
                debug!(paper = %paper_id, "run cancelled, paper not assessed");
                reports.push(AssessmentReport::cancelled(run_id, paper_id.clone()));
                continue;
            }
            reports.push(self.assess_in_run(run_id, paper_id).await);
        }

        info!(run = %run_id, "assessment run finished");
        reports
    }

    /// Assess a single paper.
    pub async fn assess(&self, paper_id: &PaperId) -> AssessmentReport {
        self.assess_in_run(Uuid::new_v4(), paper_id).await
    }

    async fn assess_in_run(&self, run_id: Uuid, paper_id: &PaperId) -> AssessmentReport {
        enter(paper_id, Stage::Init);
        if self.cancel.is_cancelled() {
            return AssessmentReport::cancelled(run_id, paper_id.clone());
        }

        let what = format!("fetching paper {}", paper_id);
        let fetched = with_retry(
            &self.retry,
            &what,
            || self.source.fetch(paper_id),
            RetrievalError::is_retryable,
            |seconds| RetrievalError::Timeout { seconds },
        )
        .await;
        let paper = match fetched.result {
            Ok(paper) => Arc::new(paper),
            Err(e) => {
                warn!(paper = %paper_id, attempts = fetched.attempts, "paper retrieval failed: {}", e);
                return AssessmentReport::failed(run_id, paper_id.clone(), e.to_string());
            }
        };

        enter(paper_id, Stage::ConceptSelection);
        let contexts = match self
            .select_concepts(&paper)
            .and_then(|ids| {
                enter(paper_id, Stage::ContextBuilding);
                ids.iter().map(|id| self.build_context(id)).collect::<GraphResult<Vec<_>>>()
            }) {
            Ok(contexts) => contexts,
            Err(e) => {
                warn!(paper = %paper_id, "could not prepare concepts: {}", e);
                return AssessmentReport::failed(run_id, paper_id.clone(), e.to_string());
            }
        };

        let (judgments, cancelled) = if self.config.parallelism > 1 {
            self.score_parallel(&paper, contexts).await
        } else {
            self.score_sequential(&paper, contexts).await
        };

        enter(paper_id, Stage::Aggregation);
        let report = AssessmentReport::summarize(
            run_id,
            &paper,
            judgments,
            &self.graph,
            &self.config,
            cancelled,
        );
        enter(paper_id, Stage::Done);
        info!(
            paper = %paper_id,
            status = ?report.status,
            verdict = ?report.verdict,
            score = ?report.aggregate_score,
            "paper assessed"
        );
        report
    }

    /// Candidate concepts for a paper, capped at `max_concepts_per_paper`.
    pub fn select_concepts(&self, paper: &Paper) -> GraphResult<Vec<ConceptId>> {
        let mut selected: Vec<ConceptId> = match &self.config.concept_selection {
            ConceptSelection::All => self.graph.ids().cloned().collect(),
            ConceptSelection::Seeds { seeds, expand } => {
                let seeds = dedup(seeds.iter().cloned());
                if *expand {
                    self.expand(seeds)?
                } else {
                    seeds
                }
            }
            ConceptSelection::Mentioned => {
                let mentioned = self.graph.mentioned_in(&paper.full_text());
                debug!(paper = %paper.id, mentioned = mentioned.len(), "concepts mentioned");
                self.expand(mentioned)?
            }
        };

        if selected.len() > self.config.max_concepts_per_paper {
            debug!(
                paper = %paper.id,
                selected = selected.len(),
                cap = self.config.max_concepts_per_paper,
                "capping selected concepts"
            );
            selected.truncate(self.config.max_concepts_per_paper);
        }
        Ok(selected)
    }

    /// Origins in order, then their neighborhoods ordered by id.
    fn expand(&self, origins: Vec<ConceptId>) -> GraphResult<Vec<ConceptId>> {
        let mut expansion = BTreeSet::new();
        for origin in &origins {
            expansion.extend(self.graph.neighbors(
                origin,
                &self.config.relation_types,
                self.config.traversal_depth,
            )?);
        }
        let mut selected = origins;
        let present: BTreeSet<ConceptId> = selected.iter().cloned().collect();
        selected.extend(expansion.into_iter().filter(|id| !present.contains(id)));
        Ok(selected)
    }

    /// Target plus its neighborhood, most specific first.
    pub fn build_context(&self, id: &ConceptId) -> GraphResult<RetrievalContext> {
        let target = self.graph.get(id)?.clone();
        let neighbors =
            self.graph
                .neighbors(id, &self.config.relation_types, self.config.traversal_depth)?;
        let concepts = self
            .graph
            .most_specific_first(neighbors)
            .iter()
            .map(|n| self.graph.get(n).cloned())
            .collect::<GraphResult<Vec<_>>>()?;
        Ok(RetrievalContext::new(target, concepts))
    }

    async fn score_sequential(
        &self,
        paper: &Paper,
        contexts: Vec<RetrievalContext>,
    ) -> (Vec<RelevanceJudgment>, bool) {
        let total = contexts.len();
        let mut judgments = Vec::with_capacity(total);

        for (index, context) in contexts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(paper = %paper.id, scored = index, total, "scoring cancelled");
                return (judgments, true);
            }
            enter(&paper.id, Stage::Scoring { index, total });
            judgments.push(score_with_retry(self.scorer.as_ref(), &self.retry, paper, context).await);
        }
        (judgments, false)
    }

    /// Bounded concurrent scoring. Judgments come back in processing order
    /// whatever order the calls finish in.
    async fn score_parallel(
        &self,
        paper: &Arc<Paper>,
        contexts: Vec<RetrievalContext>,
    ) -> (Vec<RelevanceJudgment>, bool) {
        let total = contexts.len();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism));
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;
        let mut cancelled = false;

        for (index, context) in contexts.iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("scoring semaphore closed: {}", e);
                    break;
                }
            };
            if self.cancel.is_cancelled() {
                info!(paper = %paper.id, dispatched = index, total, "scoring cancelled");
                cancelled = true;
                break;
            }

            enter(&paper.id, Stage::Scoring { index, total });
            let scorer = self.scorer.clone();
            let retry = self.retry;
            let paper = paper.clone();
            let context = context.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let judgment = score_with_retry(scorer.as_ref(), &retry, &paper, &context).await;
                (index, judgment)
            });
            dispatched += 1;
        }

        let mut slots: Vec<Option<RelevanceJudgment>> = vec![None; dispatched];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, judgment)) => slots[index] = Some(judgment),
                Err(e) => warn!(paper = %paper.id, "scoring task failed: {}", e),
            }
        }

        let judgments = slots
            .into_iter()
            .zip(&contexts)
            .map(|(slot, context)| {
                slot.unwrap_or_else(|| {
                    RelevanceJudgment::unscored(paper, context, "scoring task aborted", 0)
                })
            })
            .collect();
        (judgments, cancelled)
    }
}

fn dedup(ids: impl IntoIterator<Item = ConceptId>) -> Vec<ConceptId> {
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
