//! Ontology-fit rubric and reasoned paths
//!
//! The rubric scores how well a paper's positively judged concepts sit in
//! the ontology, out of 100 points:
//!
//! | component          | points | full marks when                                   |
//! |--------------------|--------|---------------------------------------------------|
//! | coverage           | 30     | five or more concepts matched                     |
//! | hierarchy fit      | 20     | average hierarchy depth of 3 or more              |
//! | property alignment | 20     | two non-hierarchical relations between matches    |
//! | graph coherence    | 15     | matches form one `is-a`/`equivalent-to` component |
//! | terminology        | 10     | every match is named in the paper text            |
//! | evidence           | 5      | several matches, at least one named in the text   |
//!
//! Reasoned paths are short chains through matched concepts that explain a
//! verdict to a reader.

use crate::graph::{ConceptGraph, ConceptId, Direction, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const COVERAGE_POINTS: f64 = 30.0;
pub const HIERARCHY_POINTS: f64 = 20.0;
pub const ALIGNMENT_POINTS: f64 = 20.0;
pub const COHERENCE_POINTS: f64 = 15.0;
pub const TERMINOLOGY_POINTS: f64 = 10.0;
pub const EVIDENCE_POINTS: f64 = 5.0;
/// Rubric maximum
pub const FIT_POINTS: f64 = 100.0;

const COVERAGE_SATURATION: usize = 5;
const DEPTH_SATURATION: f64 = 3.0;
const ALIGNMENT_SATURATION: usize = 2;
/// Most reasoned paths a report carries
const MAX_REASONED_PATHS: usize = 3;

/// Edges that hold matched concepts together in one component
const COHERENCE_RELATIONS: [RelationType; 2] = [RelationType::IsA, RelationType::EquivalentTo];

/// Points per rubric component for one paper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyFit {
    /// Concepts judged with a score above zero
    pub matched: usize,
    pub coverage: f64,
    pub hierarchy_fit: f64,
    pub property_alignment: f64,
    pub graph_coherence: f64,
    pub terminology: f64,
    pub evidence: f64,
    /// Sum of the components, capped at [`FIT_POINTS`]
    pub total: f64,
}

impl OntologyFit {
    /// Score the matched concepts against the graph and the paper text.
    pub fn assess(graph: &ConceptGraph, matched: &BTreeSet<ConceptId>, text: &str) -> Self {
        let n = matched.len();
        if n == 0 {
            return Self::default();
        }

        let coverage =
            n.min(COVERAGE_SATURATION) as f64 / COVERAGE_SATURATION as f64 * COVERAGE_POINTS;

        let depths: Vec<usize> = matched.iter().filter_map(|id| graph.depth_of(id)).collect();
        let hierarchy_fit = if depths.is_empty() {
            0.0
        } else {
            let average = depths.iter().sum::<usize>() as f64 / depths.len() as f64;
            (average / DEPTH_SATURATION).min(1.0) * HIERARCHY_POINTS
        };

        let aligned = aligned_relations(graph, matched).len();
        let property_alignment = aligned.min(ALIGNMENT_SATURATION) as f64
            / ALIGNMENT_SATURATION as f64
            * ALIGNMENT_POINTS;

        let graph_coherence = match component_count(graph, matched) {
            0 => 0.0,
            1 => COHERENCE_POINTS,
            k => (COHERENCE_POINTS * (1.0 - (k - 1) as f64 / n as f64)).max(0.0),
        };

        let named = matched
            .iter()
            .filter(|id| graph.get(id).is_ok_and(|c| c.is_mentioned_in(text)))
            .count();
        let terminology = named as f64 / n as f64 * TERMINOLOGY_POINTS;
        let evidence = if named > 0 && n > 1 {
            EVIDENCE_POINTS
        } else if named > 0 {
            4.0
        } else {
            2.0
        };

        let total = (coverage
            + hierarchy_fit
            + property_alignment
            + graph_coherence
            + terminology
            + evidence)
            .min(FIT_POINTS);

        Self {
            matched: n,
            coverage,
            hierarchy_fit,
            property_alignment,
            graph_coherence,
            terminology,
            evidence,
            total,
        }
    }

    /// Total scaled to `[0, 1]`, comparable with judgment scores
    pub fn score(&self) -> f64 {
        self.total / FIT_POINTS
    }
}

/// A short chain through matched concepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReasonedPath {
    /// A non-hierarchical relation between two matches
    Relation {
        source: ConceptId,
        relation: RelationType,
        target: ConceptId,
    },
    /// Two matches under a common parent
    Siblings {
        parent: ConceptId,
        first: ConceptId,
        second: ConceptId,
    },
    /// Three matches along one `is-a` line
    Chain {
        child: ConceptId,
        parent: ConceptId,
        grandparent: ConceptId,
    },
}

impl ReasonedPath {
    /// Human-readable form using concept labels.
    pub fn describe(&self, graph: &ConceptGraph) -> String {
        let label = |id: &ConceptId| {
            graph
                .get(id)
                .map(|c| c.display_label().to_string())
                .unwrap_or_else(|_| id.to_string())
        };
        match self {
            ReasonedPath::Relation {
                source,
                relation,
                target,
            } => format!("{} {} {}", label(source), relation.as_str(), label(target)),
            ReasonedPath::Siblings {
                parent,
                first,
                second,
            } => format!(
                "{} and {} share parent {}",
                label(first),
                label(second),
                label(parent)
            ),
            ReasonedPath::Chain {
                child,
                parent,
                grandparent,
            } => format!(
                "{} is-a {} is-a {}",
                label(child),
                label(parent),
                label(grandparent)
            ),
        }
    }
}

/// At most one path of each kind: relation, siblings, then chain.
pub fn reasoned_paths(graph: &ConceptGraph, matched: &BTreeSet<ConceptId>) -> Vec<ReasonedPath> {
    let mut paths = Vec::new();
    if let Some((source, relation, target)) = aligned_relations(graph, matched).into_iter().next() {
        paths.push(ReasonedPath::Relation {
            source,
            relation,
            target,
        });
    }
    paths.extend(siblings(graph, matched));
    paths.extend(chain(graph, matched));
    paths.truncate(MAX_REASONED_PATHS);
    paths
}

/// Non-hierarchical relations whose endpoints are both matched, by source id.
fn aligned_relations(
    graph: &ConceptGraph,
    matched: &BTreeSet<ConceptId>,
) -> Vec<(ConceptId, RelationType, ConceptId)> {
    matched
        .iter()
        .filter_map(|id| graph.get(id).ok())
        .flat_map(|concept| {
            concept
                .relations
                .iter()
                .filter(|rel| matches!(rel.relation, RelationType::PartOf | RelationType::RelatedTo))
                .filter(move |rel| rel.target != concept.id && matched.contains(&rel.target))
                .map(move |rel| (concept.id.clone(), rel.relation, rel.target.clone()))
        })
        .collect()
}

/// Connected components among matched concepts over direct hierarchy edges.
fn component_count(graph: &ConceptGraph, matched: &BTreeSet<ConceptId>) -> usize {
    let mut seen: BTreeSet<ConceptId> = BTreeSet::new();
    let mut count = 0;
    for start in matched {
        if !seen.insert(start.clone()) {
            continue;
        }
        count += 1;
        let mut stack = vec![start.clone()];
        while let Some(id) = stack.pop() {
            let linked = graph
                .neighbors(&id, &COHERENCE_RELATIONS, 1)
                .unwrap_or_default();
            for next in linked {
                if matched.contains(&next) && seen.insert(next.clone()) {
                    stack.push(next);
                }
            }
        }
    }
    count
}

fn parents(graph: &ConceptGraph, id: &ConceptId) -> BTreeSet<ConceptId> {
    graph
        .neighbors_directed(id, &[RelationType::IsA], 1, Direction::Outgoing)
        .unwrap_or_default()
}

fn siblings(graph: &ConceptGraph, matched: &BTreeSet<ConceptId>) -> Option<ReasonedPath> {
    graph.ids().find_map(|parent| {
        let mut children = graph
            .neighbors_directed(parent, &[RelationType::IsA], 1, Direction::Incoming)
            .unwrap_or_default()
            .into_iter()
            .filter(|child| matched.contains(child));
        let first = children.next()?;
        let second = children.next()?;
        Some(ReasonedPath::Siblings {
            parent: parent.clone(),
            first,
            second,
        })
    })
}

fn chain(graph: &ConceptGraph, matched: &BTreeSet<ConceptId>) -> Option<ReasonedPath> {
    matched.iter().find_map(|child| {
        parents(graph, child)
            .into_iter()
            .filter(|parent| matched.contains(parent))
            .find_map(|parent| {
                let grandparent = parents(graph, &parent)
                    .into_iter()
                    .find(|g| matched.contains(g))?;
                Some(ReasonedPath::Chain {
                    child: child.clone(),
                    parent,
                    grandparent,
                })
            })
    })
}
