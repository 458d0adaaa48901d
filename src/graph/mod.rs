//! Ontology graph: concepts, typed relations and bounded traversal

mod concept;
mod load;
mod ontology;
mod traverse;


pub use concept::{Concept, ConceptId, Relation, RelationType};
pub use load::{concepts_from_json_str, concepts_from_yaml_str, load_concepts};
pub use ontology::{ConceptGraph, GraphError, GraphResult, IntegrityViolation};
pub use traverse::{Direction, NeighborQuery};
