//! Paper retrieval: the contract paper sources implement
//!
//! The core never talks to a bibliographic API directly. It asks a
//! `PaperSource` for paper records by id and for candidate paper ids per
//! concept. Two implementations ship with the crate:
//! - `JsonPaperSource`: a paper collection exported to a JSON file
//! - `MockPaperSource`: preconfigured papers and scripted failures (testing)

mod json;
mod mock;

pub use json::JsonPaperSource;
pub use mock::MockPaperSource;

use crate::graph::Concept;
use crate::paper::{Paper, PaperId};
use async_trait::async_trait;

/// Errors from paper source operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetrievalError {
    #[error("paper not found: {0}")]
    NotFound(PaperId),
    #[error("paper source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed paper record: {0}")]
    Malformed(String),
    #[error("paper retrieval timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },
    #[error("paper source I/O error: {0}")]
    Io(String),
}

impl RetrievalError {
    /// Whether another attempt could succeed.
    ///
    /// Missing and malformed records are permanent; outages, timeouts and
    /// I/O failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::Unavailable(_) | RetrievalError::Timeout { .. } | RetrievalError::Io(_)
        )
    }
}

/// Source of paper records.
///
/// Abstracts over transport (file, HTTP API, mock) so the pipeline doesn't
/// depend on where papers come from.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Fetch a single paper by id.
    async fn fetch(&self, id: &PaperId) -> Result<Paper, RetrievalError>;

    /// Candidate paper ids for a concept, in the source's preferred order.
    async fn candidates(&self, concept: &Concept) -> Result<Vec<PaperId>, RetrievalError>;
}
