//! Paper collection loaded from a JSON export

use super::{PaperSource, RetrievalError};
use crate::graph::Concept;
use crate::paper::{Paper, PaperId, PaperMetadata};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Read the first present string field among `keys`.
fn string_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            // Abstracts sometimes arrive as a list of paragraphs
            Value::Array(parts) => {
                let parts: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            _ => None,
        })
}

fn string_list(record: &Value, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Convert one exported record into a paper.
///
/// Accepts both naming conventions seen in exports (`id`/`paper_id`,
/// `title`/`paper_title`, `abstract`/`paper_abstract`). Returns `None` for
/// records with neither a title nor an abstract.
fn paper_from_record(index: usize, record: &Value, source: &str) -> Option<Paper> {
    let title = string_field(record, &["title", "paper_title"]).unwrap_or_default();
    let abstract_text = string_field(record, &["abstract", "paper_abstract"]).unwrap_or_default();

    if title.trim().is_empty() && abstract_text.trim().is_empty() {
        return None;
    }

    let id = string_field(record, &["id", "paper_id"])
        .map(PaperId::from)
        .unwrap_or_else(|| PaperId::from(format!("paper_{}", index)));

    let metadata = PaperMetadata {
        authors: string_list(record, "authors"),
        year: record
            .get("year")
            .and_then(Value::as_i64)
            .and_then(|y| i32::try_from(y).ok()),
        source: Some(source.to_string()),
        keywords: string_list(record, "keywords"),
        mesh_terms: string_list(record, "mesh_terms"),
    };

    Some(Paper {
        id,
        title,
        abstract_text,
        metadata,
    })
}

/// Paper source backed by an in-memory collection, typically a JSON export.
///
/// Candidate papers for a concept are those whose title or abstract mention
/// the concept's label or one of its synonyms as a whole word.
#[derive(Debug, Clone, Default)]
pub struct JsonPaperSource {
    papers: BTreeMap<PaperId, Paper>,
    /// Load order, used for candidate ordering
    order: Vec<PaperId>,
}

impl JsonPaperSource {
    /// Build a source from already-constructed papers. Later duplicates
    /// replace earlier ones.
    pub fn from_papers(papers: impl IntoIterator<Item = Paper>) -> Self {
        let mut source = Self::default();
        for paper in papers {
            if !source.papers.contains_key(&paper.id) {
                source.order.push(paper.id.clone());
            }
            source.papers.insert(paper.id.clone(), paper);
        }
        source
    }

    /// Parse a JSON array of paper records.
    pub fn from_json_str(content: &str, source_name: &str) -> Result<Self, RetrievalError> {
        let records: Vec<Value> = serde_json::from_str(content)
            .map_err(|e| RetrievalError::Malformed(format!("expected a JSON array of papers: {}", e)))?;

        let mut papers = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match paper_from_record(index, record, source_name) {
                Some(paper) => papers.push(paper),
                None => warn!(index, "paper record has no title or abstract, skipping"),
            }
        }
        debug!(count = papers.len(), source = source_name, "loaded paper collection");
        Ok(Self::from_papers(papers))
    }

    /// Load a JSON paper collection from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RetrievalError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content, &path.display().to_string())
    }

    /// Number of papers held
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Paper ids in load order
    pub fn ids(&self) -> &[PaperId] {
        &self.order
    }
}

#[async_trait]
impl PaperSource for JsonPaperSource {
    async fn fetch(&self, id: &PaperId) -> Result<Paper, RetrievalError> {
        self.papers
            .get(id)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(id.clone()))
    }

    async fn candidates(&self, concept: &Concept) -> Result<Vec<PaperId>, RetrievalError> {
        Ok(self
            .order
            .iter()
            .filter(|id| {
                self.papers
                    .get(*id)
                    .is_some_and(|p| concept.is_mentioned_in(&p.full_text()))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"[
        {
            "id": 24231,
            "title": "An agent-based model of influenza transmission",
            "abstract": ["We simulate influenza spread.", "Vaccination reduces attack rate."],
            "authors": ["A. Author", "B. Author"],
            "year": 2021
        },
        {
            "paper_id": "p-2",
            "paper_title": "Cholera in refugee camps",
            "paper_abstract": "A compartmental model of cholera."
        },
        {
            "title": "",
            "abstract": ""
        },
        {
            "abstract": "Untitled work on malaria vectors."
        }
    ]"#;

    #[tokio::test]
    async fn loads_both_naming_conventions() {
        let source = JsonPaperSource::from_json_str(COLLECTION, "test").unwrap();
        assert_eq!(source.len(), 3);

        let paper = source.fetch(&PaperId::from("24231")).await.unwrap();
        assert_eq!(
            paper.abstract_text,
            "We simulate influenza spread. Vaccination reduces attack rate."
        );
        assert_eq!(paper.metadata.authors.len(), 2);
        assert_eq!(paper.metadata.year, Some(2021));

        let paper = source.fetch(&PaperId::from("p-2")).await.unwrap();
        assert_eq!(paper.title, "Cholera in refugee camps");
    }

    #[tokio::test]
    async fn records_without_id_get_positional_ids() {
        let source = JsonPaperSource::from_json_str(COLLECTION, "test").unwrap();
        assert!(source.fetch(&PaperId::from("paper_3")).await.is_ok());
        assert_eq!(
            source.ids(),
            &[PaperId::from("24231"), PaperId::from("p-2"), PaperId::from("paper_3")]
        );
    }

    #[tokio::test]
    async fn missing_paper_is_not_found() {
        let source = JsonPaperSource::from_json_str(COLLECTION, "test").unwrap();
        let err = source.fetch(&PaperId::from("nope")).await.unwrap_err();
        assert!(matches!(err, RetrievalError::NotFound(_)));
    }

    #[tokio::test]
    async fn candidates_are_papers_mentioning_the_concept() {
        let source = JsonPaperSource::from_json_str(COLLECTION, "test").unwrap();
        let concept = Concept::new("ido:cholera", "cholera");
        let ids = source.candidates(&concept).await.unwrap();
        assert_eq!(ids, vec![PaperId::from("p-2")]);

        let concept = Concept::new("ido:flu", "flu").with_synonym("influenza");
        let ids = source.candidates(&concept).await.unwrap();
        assert_eq!(ids, vec![PaperId::from("24231")]);
    }

    #[test]
    fn non_array_input_is_malformed() {
        let err = JsonPaperSource::from_json_str(r#"{"papers": []}"#, "test").unwrap_err();
        assert!(matches!(err, RetrievalError::Malformed(_)));
    }
}
