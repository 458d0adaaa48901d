//! Ontoscope: ontology-grounded relevance assessment of scientific papers
//!
//! Builds an in-memory graph from parsed ontology concepts, then scores
//! papers against concepts with a language model, using the graph
//! neighborhood of each concept as retrieval context.
//!
//! # Core Concepts
//!
//! - **Concepts**: ontology classes with labels, definitions and typed relations
//! - **Retrieval context**: a concept plus its neighbors, most specific first
//! - **Judgments**: one relevance score and rationale per (paper, concept) pair
//! - **Reports**: judgments aggregated per paper, flagged complete or partial
//!
//! # Example
//!
//! ```
//! use ontoscope::{Concept, ConceptGraph, ConceptId, RelationType};
//!
//! let graph = ConceptGraph::build(vec![
//!     Concept::new("A", "infectious disease"),
//!     Concept::new("B", "influenza").is_a("A"),
//! ])
//! .unwrap();
//! let near = graph
//!     .neighbors(&ConceptId::from("A"), &[RelationType::IsA], 1)
//!     .unwrap();
//! assert!(near.contains(&ConceptId::from("B")));
//! ```

pub mod graph;
pub mod llm;
pub mod paper;
pub mod pipeline;
pub mod retrieval;
pub mod scoring;

pub use graph::{
    load_concepts, Concept, ConceptGraph, ConceptId, Direction, GraphError, GraphResult,
    IntegrityViolation, NeighborQuery, Relation, RelationType,
};
pub use llm::{CommandModel, LanguageModel, LlmError, MockModel};
pub use paper::{Paper, PaperId, PaperMetadata};
pub use pipeline::{
    AggregationRule, AssessmentReport, CancellationToken, ConceptSelection, ConfigError,
    GraphRagPipeline, OntologyFit, PipelineConfig, PipelineError, ReasonedPath, ReportStatus,
    Verdict,
};
pub use retrieval::{JsonPaperSource, MockPaperSource, PaperSource, RetrievalError};
pub use scoring::{
    JudgmentOutcome, LlmScorer, RelevanceJudgment, RelevanceLevel, RelevanceScorer,
    RetrievalContext, ScoreError, ScoreScale,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
