//! Loading parsed concept records from JSON or YAML files
//!
//! OWL parsing happens upstream; these files hold the already-extracted
//! concept list (id, label, definition, synonyms, typed relations).

use super::concept::Concept;
use super::ontology::{GraphError, GraphResult};
use serde::Deserialize;
use std::path::Path;

/// Accepted top-level shapes: a bare list, or `{ concepts: [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum ConceptFile {
    List(Vec<Concept>),
    Wrapped { concepts: Vec<Concept> },
}

impl ConceptFile {
    fn into_concepts(self) -> Vec<Concept> {
        match self {
            ConceptFile::List(concepts) | ConceptFile::Wrapped { concepts } => concepts,
        }
    }
}

/// Parse concept records from a JSON string
pub fn concepts_from_json_str(content: &str) -> Result<Vec<Concept>, String> {
    serde_json::from_str::<ConceptFile>(content)
        .map(ConceptFile::into_concepts)
        .map_err(|e| format!("JSON parse error: {}", e))
}

/// Parse concept records from a YAML string
pub fn concepts_from_yaml_str(content: &str) -> Result<Vec<Concept>, String> {
    serde_yaml::from_str::<ConceptFile>(content)
        .map(ConceptFile::into_concepts)
        .map_err(|e| format!("YAML parse error: {}", e))
}

/// Load concept records from a file, picking the format by extension
/// (`.yaml`/`.yml` for YAML, anything else as JSON).
pub fn load_concepts(path: impl AsRef<Path>) -> GraphResult<Vec<Concept>> {
    let path = path.as_ref();
    let load_error = |message: String| GraphError::Load {
        path: path.display().to_string(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let concepts = if is_yaml {
        concepts_from_yaml_str(&content)
    } else {
        concepts_from_json_str(&content)
    };
    concepts.map_err(load_error)
}
