//! Common test utilities for pipeline integration tests
//!
//! Shared ontology and paper fixtures plus deterministic scorers that stand
//! in for a language model.

#![allow(dead_code, unused_imports)]

pub mod fixtures;
pub mod scorers;

pub use fixtures::{disease_graph, influenza_paper, paper_ids, paper_source, seeds, write_file};
pub use scorers::{CancellingScorer, LexicalScorer};
