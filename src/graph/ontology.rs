//! ConceptGraph: the read-only ontology graph

use super::concept::{Concept, ConceptId, RelationType};
use super::traverse::{Direction, NeighborQuery};
use regex_lite::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use thiserror::Error;

/// A single problem found while validating concept records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Two records share an id
    DuplicateConcept(ConceptId),
    /// A relation points at an id that no record defines
    DanglingEdge {
        source: ConceptId,
        relation: RelationType,
        target: ConceptId,
    },
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateConcept(id) => write!(f, "duplicate concept id {}", id),
            Self::DanglingEdge {
                source,
                relation,
                target,
            } => write!(f, "{} -{}-> {} references an unknown concept", source, relation, target),
        }
    }
}

fn join_violations(violations: &[IntegrityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while building or querying the concept graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("ontology integrity check failed: {}", join_violations(.0))]
    Integrity(Vec<IntegrityViolation>),

    #[error("Concept not found: {0}")]
    ConceptNotFound(ConceptId),

    #[error("traversal depth must be at least 1, got {0}")]
    InvalidDepth(usize),

    #[error("failed to load concepts from {path}: {message}")]
    Load { path: String, message: String },
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Adjacency entry: the relation and the concept at the other end
pub(crate) type Adjacent = (RelationType, ConceptId);

/// In-memory ontology graph.
///
/// Built once from parsed concept records and never mutated afterwards, so it
/// can be shared behind an `Arc` by concurrent scoring tasks without locking.
/// Iteration order is by concept id.
#[derive(Debug, Clone)]
pub struct ConceptGraph {
    concepts: BTreeMap<ConceptId, Concept>,
    outgoing: HashMap<ConceptId, Vec<Adjacent>>,
    incoming: HashMap<ConceptId, Vec<Adjacent>>,
    /// Hierarchy depth: 0 for roots, shortest `is-a` distance otherwise
    depths: HashMap<ConceptId, usize>,
    roots: Vec<ConceptId>,
    /// Whole-word patterns over lowercased labels and synonyms
    mention_patterns: Vec<(ConceptId, Vec<Regex>)>,
}

impl ConceptGraph {
    /// Build the graph, validating that ids are unique and every relation
    /// target exists.
    ///
    /// All violations are collected before failing, so a broken ontology is
    /// reported in one pass.
    pub fn build(concepts: impl IntoIterator<Item = Concept>) -> GraphResult<Self> {
        let mut by_id: BTreeMap<ConceptId, Concept> = BTreeMap::new();
        let mut violations = Vec::new();

        for concept in concepts {
            if by_id.contains_key(&concept.id) {
                violations.push(IntegrityViolation::DuplicateConcept(concept.id.clone()));
                continue;
            }
            by_id.insert(concept.id.clone(), concept);
        }

        let mut outgoing: HashMap<ConceptId, Vec<Adjacent>> = HashMap::new();
        let mut incoming: HashMap<ConceptId, Vec<Adjacent>> = HashMap::new();

        for concept in by_id.values() {
            for rel in &concept.relations {
                if !by_id.contains_key(&rel.target) {
                    violations.push(IntegrityViolation::DanglingEdge {
                        source: concept.id.clone(),
                        relation: rel.relation,
                        target: rel.target.clone(),
                    });
                    continue;
                }
                outgoing
                    .entry(concept.id.clone())
                    .or_default()
                    .push((rel.relation, rel.target.clone()));
                incoming
                    .entry(rel.target.clone())
                    .or_default()
                    .push((rel.relation, concept.id.clone()));
            }
        }

        if !violations.is_empty() {
            return Err(GraphError::Integrity(violations));
        }

        let mention_patterns = by_id
            .values()
            .map(|c| (c.id.clone(), c.mention_patterns()))
            .filter(|(_, patterns)| !patterns.is_empty())
            .collect();

        let mut graph = Self {
            concepts: by_id,
            outgoing,
            incoming,
            depths: HashMap::new(),
            roots: Vec::new(),
            mention_patterns,
        };
        graph.compute_hierarchy();
        Ok(graph)
    }

    /// Roots are concepts without an `is-a` parent. Depths come from a BFS
    /// down the hierarchy from every root; the shortest distance wins.
    fn compute_hierarchy(&mut self) {
        let roots: Vec<ConceptId> = self
            .concepts
            .keys()
            .filter(|id| {
                !self
                    .outgoing_edges(id)
                    .iter()
                    .any(|(rel, _)| *rel == RelationType::IsA)
            })
            .cloned()
            .collect();

        let mut depths: HashMap<ConceptId, usize> = HashMap::new();
        for root in &roots {
            depths.insert(root.clone(), 0);
            let mut queue = VecDeque::from([root.clone()]);
            while let Some(current) = queue.pop_front() {
                let current_depth = depths[&current];
                for (rel, child) in self.incoming_edges(&current) {
                    if *rel != RelationType::IsA {
                        continue;
                    }
                    let better = depths
                        .get(child)
                        .map_or(true, |d| *d > current_depth + 1);
                    if better {
                        depths.insert(child.clone(), current_depth + 1);
                        queue.push_back(child.clone());
                    }
                }
            }
        }

        self.roots = roots;
        self.depths = depths;
    }

    /// Get a concept by ID
    pub fn get(&self, id: &ConceptId) -> GraphResult<&Concept> {
        self.concepts
            .get(id)
            .ok_or_else(|| GraphError::ConceptNotFound(id.clone()))
    }

    /// Check if a concept exists
    pub fn contains(&self, id: &ConceptId) -> bool {
        self.concepts.contains_key(id)
    }

    /// All concepts, ordered by id
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// All concept ids, ordered
    pub fn ids(&self) -> impl Iterator<Item = &ConceptId> {
        self.concepts.keys()
    }

    /// Number of concepts
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Number of validated relation edges
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum()
    }

    pub(crate) fn outgoing_edges(&self, id: &ConceptId) -> &[Adjacent] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn incoming_edges(&self, id: &ConceptId) -> &[Adjacent] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concepts reachable within `depth` hops along the given relation types,
    /// in either edge direction, excluding `id` itself.
    pub fn neighbors(
        &self,
        id: &ConceptId,
        relation_types: &[RelationType],
        depth: usize,
    ) -> GraphResult<BTreeSet<ConceptId>> {
        self.neighbors_directed(id, relation_types, depth, Direction::Both)
    }

    /// Like [`neighbors`](Self::neighbors) but restricted to one edge direction.
    pub fn neighbors_directed(
        &self,
        id: &ConceptId,
        relation_types: &[RelationType],
        depth: usize,
        direction: Direction,
    ) -> GraphResult<BTreeSet<ConceptId>> {
        NeighborQuery::from(id.clone())
            .relations(relation_types.iter().copied())
            .depth(depth)
            .direction(direction)
            .execute(self)
    }

    /// Transitive `is-a` parents
    pub fn ancestors(&self, id: &ConceptId) -> GraphResult<BTreeSet<ConceptId>> {
        NeighborQuery::from(id.clone())
            .relations([RelationType::IsA])
            .unbounded()
            .direction(Direction::Outgoing)
            .execute(self)
    }

    /// Transitive `is-a` children
    pub fn descendants(&self, id: &ConceptId) -> GraphResult<BTreeSet<ConceptId>> {
        NeighborQuery::from(id.clone())
            .relations([RelationType::IsA])
            .unbounded()
            .direction(Direction::Incoming)
            .execute(self)
    }

    /// Hierarchy depth of a concept (roots are 0).
    ///
    /// `None` for concepts that only sit on an `is-a` cycle and never reach a root.
    pub fn depth_of(&self, id: &ConceptId) -> Option<usize> {
        self.depths.get(id).copied()
    }

    /// Top-level concepts (no `is-a` parent), ordered by id
    pub fn roots(&self) -> &[ConceptId] {
        &self.roots
    }

    /// Roots above a concept, including the concept itself if it is a root
    pub fn roots_of(&self, id: &ConceptId) -> GraphResult<BTreeSet<ConceptId>> {
        let mut lineage = self.ancestors(id)?;
        lineage.insert(id.clone());
        Ok(lineage
            .into_iter()
            .filter(|c| self.roots.binary_search(c).is_ok())
            .collect())
    }

    /// Order concepts most-specific first: deeper in the hierarchy first,
    /// then by id. Concepts without a depth sort as roots.
    pub fn most_specific_first(&self, ids: impl IntoIterator<Item = ConceptId>) -> Vec<ConceptId> {
        let mut ids: Vec<ConceptId> = ids.into_iter().collect();
        ids.sort_by(|a, b| {
            let da = self.depth_of(a).unwrap_or(0);
            let db = self.depth_of(b).unwrap_or(0);
            db.cmp(&da).then_with(|| a.cmp(b))
        });
        ids
    }

    /// Concepts whose label or a synonym occurs in `text` as a whole word,
    /// case-insensitively. Ordered by concept id.
    pub fn mentioned_in(&self, text: &str) -> Vec<ConceptId> {
        let haystack = text.to_lowercase();
        self.mention_patterns
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| p.is_match(&haystack)))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
