//! GraphRAG pipeline: concept selection, retrieval context, scoring and
//! per-paper aggregation

mod cancel;
mod config;
mod fit;
mod report;
mod retry;
mod run;

pub use cancel::CancellationToken;
pub use config::{
    AggregationRule, ConceptSelection, ConfigError, PipelineConfig, MAX_CALL_TIMEOUT,
};
pub use fit::{reasoned_paths, OntologyFit, ReasonedPath, FIT_POINTS};
pub use report::{
    AssessmentReport, ConceptScore, ReportStatus, Verdict, PARTIAL_THRESHOLD, RELEVANT_THRESHOLD,
};
pub use retry::{with_retry, Attempted, RetryPolicy};
pub use run::{GraphRagPipeline, PipelineError, Stage};
