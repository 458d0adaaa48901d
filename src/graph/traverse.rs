//! Bounded, cycle-safe neighborhood traversal

use super::concept::{ConceptId, RelationType};
use super::ontology::{Adjacent, ConceptGraph, GraphError, GraphResult};
use std::collections::{BTreeSet, HashSet};

/// Direction for edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Follow outgoing edges (source -> target)
    Outgoing,
    /// Follow incoming edges (target <- source)
    Incoming,
    /// Follow edges in both directions
    #[default]
    Both,
}

/// Query for the neighborhood of a concept
#[derive(Debug, Clone)]
pub struct NeighborQuery {
    /// Starting concept
    pub origin: ConceptId,
    /// Maximum hops (1 = direct neighbors). `None` means unbounded.
    pub max_depth: Option<usize>,
    /// Direction to traverse edges
    pub direction: Direction,
    /// Relation types to follow; empty follows nothing
    pub relation_types: BTreeSet<RelationType>,
}

impl NeighborQuery {
    /// Create a new query: direct neighbors over every relation type, both directions
    pub fn from(origin: ConceptId) -> Self {
        Self {
            origin,
            max_depth: Some(1),
            direction: Direction::Both,
            relation_types: RelationType::ALL.into_iter().collect(),
        }
    }

    /// Set the maximum traversal depth
    pub fn depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Traverse until the reachable set is exhausted
    pub fn unbounded(mut self) -> Self {
        self.max_depth = None;
        self
    }

    /// Set the traversal direction
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Restrict traversal to these relation types
    pub fn relations(mut self, relation_types: impl IntoIterator<Item = RelationType>) -> Self {
        self.relation_types = relation_types.into_iter().collect();
        self
    }

    /// Execute the traversal, returning the reached concepts without the origin
    pub fn execute(&self, graph: &ConceptGraph) -> GraphResult<BTreeSet<ConceptId>> {
        Ok(self
            .execute_levels(graph)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Execute the traversal, grouping reached concepts by hop distance.
    ///
    /// Level 0 holds the direct neighbors. Concepts appear once, at the level
    /// where they were first reached.
    pub fn execute_levels(&self, graph: &ConceptGraph) -> GraphResult<Vec<Vec<ConceptId>>> {
        if self.max_depth == Some(0) {
            return Err(GraphError::InvalidDepth(0));
        }
        graph.get(&self.origin)?;

        let mut visited: HashSet<&ConceptId> = HashSet::new();
        visited.insert(&self.origin);
        let mut current_level: Vec<&ConceptId> = vec![&self.origin];
        let mut levels = Vec::new();
        let mut hops = 0usize;

        while !current_level.is_empty() {
            if self.max_depth.is_some_and(|max| hops >= max) {
                break;
            }
            hops += 1;

            let mut next_level: Vec<&ConceptId> = Vec::new();
            for id in &current_level {
                for (relation, neighbor) in self.edges(graph, id) {
                    if !self.relation_types.contains(relation) {
                        continue;
                    }
                    if visited.insert(neighbor) {
                        next_level.push(neighbor);
                    }
                }
            }

            if !next_level.is_empty() {
                let mut level: Vec<ConceptId> = next_level.iter().map(|id| (*id).clone()).collect();
                level.sort();
                levels.push(level);
            }
            current_level = next_level;
        }

        Ok(levels)
    }

    /// Get edges for a concept based on direction
    fn edges<'g>(&self, graph: &'g ConceptGraph, id: &ConceptId) -> Vec<&'g Adjacent> {
        match self.direction {
            Direction::Outgoing => graph.outgoing_edges(id).iter().collect(),
            Direction::Incoming => graph.incoming_edges(id).iter().collect(),
            Direction::Both => graph
                .outgoing_edges(id)
                .iter()
                .chain(graph.incoming_edges(id))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Concept;

    // A <-is-a- B <-is-a- D
    // A <-is-a- C
    // B -related-to- C, C -related-to- B (mutual)
    fn create_test_graph() -> ConceptGraph {
        ConceptGraph::build(vec![
            Concept::new("A", "a"),
            Concept::new("B", "b")
                .is_a("A")
                .with_relation(RelationType::RelatedTo, "C"),
            Concept::new("C", "c")
                .is_a("A")
                .with_relation(RelationType::RelatedTo, "B"),
            Concept::new("D", "d").is_a("B"),
        ])
        .unwrap()
    }

    fn ids(names: &[&str]) -> BTreeSet<ConceptId> {
        names.iter().map(|n| ConceptId::from(*n)).collect()
    }

    #[test]
    fn depth_one_returns_direct_neighbors_only() {
        let graph = create_test_graph();
        let result = NeighborQuery::from("A".into())
            .relations([RelationType::IsA])
            .execute(&graph)
            .unwrap();
        assert_eq!(result, ids(&["B", "C"]));
    }

    #[test]
    fn depth_two_reaches_grandchildren() {
        let graph = create_test_graph();
        let levels = NeighborQuery::from("A".into())
            .relations([RelationType::IsA])
            .depth(2)
            .execute_levels(&graph)
            .unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1], vec![ConceptId::from("D")]);
    }

    #[test]
    fn relation_filter_excludes_other_edges() {
        let graph = create_test_graph();
        let result = NeighborQuery::from("B".into())
            .relations([RelationType::RelatedTo])
            .depth(3)
            .execute(&graph)
            .unwrap();
        assert_eq!(result, ids(&["C"]));
    }

    #[test]
    fn outgoing_only_follows_parents() {
        let graph = create_test_graph();
        let result = NeighborQuery::from("D".into())
            .relations([RelationType::IsA])
            .direction(Direction::Outgoing)
            .unbounded()
            .execute(&graph)
            .unwrap();
        assert_eq!(result, ids(&["A", "B"]));
    }

    #[test]
    fn mutual_edges_terminate_and_exclude_origin() {
        let graph = create_test_graph();
        let result = NeighborQuery::from("B".into())
            .unbounded()
            .execute(&graph)
            .unwrap();
        assert_eq!(result, ids(&["A", "C", "D"]));
    }

    #[test]
    fn zero_depth_is_rejected() {
        let graph = create_test_graph();
        let err = NeighborQuery::from("A".into())
            .depth(0)
            .execute(&graph)
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidDepth(0)));
    }

    #[test]
    fn unknown_origin_is_not_found() {
        let graph = create_test_graph();
        let err = NeighborQuery::from("Z".into()).execute(&graph).unwrap_err();
        assert!(matches!(err, GraphError::ConceptNotFound(_)));
    }

    #[test]
    fn empty_relation_set_reaches_nothing() {
        let graph = create_test_graph();
        let result = NeighborQuery::from("A".into())
            .relations(Vec::new())
            .execute(&graph)
            .unwrap();
        assert!(result.is_empty());
    }
}
