//! Ontology and paper fixtures

use ontoscope::{
    Concept, ConceptGraph, ConceptId, ConceptSelection, MockPaperSource, Paper, PaperId,
    RelationType,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Small infectious disease hierarchy:
///
/// ```text
/// A infectious disease
/// ├── B influenza
/// │   └── D avian influenza
/// └── C cholera
/// V vaccine ──related-to──> B
/// ```
pub fn disease_graph() -> Arc<ConceptGraph> {
    let concepts = vec![
        Concept::new("A", "infectious disease")
            .with_definition("A disease caused by a pathogen in a host."),
        Concept::new("B", "influenza")
            .with_definition("A viral infection of the respiratory tract.")
            .with_synonym("flu")
            .is_a("A"),
        Concept::new("C", "cholera")
            .with_definition("A bacterial infection of the small intestine.")
            .is_a("A"),
        Concept::new("D", "avian influenza").is_a("B"),
        Concept::new("V", "vaccine").with_relation(RelationType::RelatedTo, "B"),
    ];
    Arc::new(ConceptGraph::build(concepts).expect("fixture ontology is valid"))
}

pub fn influenza_paper(id: &str) -> Paper {
    Paper::new(
        id,
        "Influenza transmission in primary schools",
        "We fit a household model to influenza case data from three school terms.\n\n\
         Closures reduced peak incidence by a quarter.",
    )
}

/// Source holding `influenza_paper` under each of `ids`.
pub fn paper_source(ids: &[&str]) -> MockPaperSource {
    ids.iter()
        .fold(MockPaperSource::new(), |source, id| {
            source.with_paper(influenza_paper(id))
        })
}

pub fn seeds(ids: &[&str], expand: bool) -> ConceptSelection {
    ConceptSelection::Seeds {
        seeds: ids.iter().map(|id| ConceptId::from(*id)).collect(),
        expand,
    }
}

pub fn paper_ids(ids: &[&str]) -> Vec<PaperId> {
    ids.iter().map(|id| PaperId::from(*id)).collect()
}

/// Write `content` to `name` inside `dir`.
pub fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture file");
    file.write_all(content.as_bytes()).expect("write fixture file");
    path
}
