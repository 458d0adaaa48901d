//! Per-paper assessment reports and score aggregation

use super::config::PipelineConfig;
use super::fit::{reasoned_paths, OntologyFit, ReasonedPath};
use crate::graph::{ConceptGraph, ConceptId};
use crate::paper::{Paper, PaperId};
use crate::scoring::{RelevanceJudgment, RelevanceLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Aggregate score at or above which a paper is relevant
pub const RELEVANT_THRESHOLD: f64 = 0.7;
/// Aggregate score at or above which a paper is partially relevant
pub const PARTIAL_THRESHOLD: f64 = 0.3;

/// Completeness of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    /// Every selected concept was scored
    Complete,
    /// Some judgments are unscored
    Partial,
    /// The paper could not be retrieved
    Failed,
    /// The run was cancelled before every concept was scored
    Cancelled,
}

/// Overall judgment for a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Relevant,
    PartiallyRelevant,
    NotRelevant,
    /// Nothing was scored
    Undetermined,
}

impl Verdict {
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => Verdict::Undetermined,
            Some(s) if s >= RELEVANT_THRESHOLD => Verdict::Relevant,
            Some(s) if s >= PARTIAL_THRESHOLD => Verdict::PartiallyRelevant,
            Some(_) => Verdict::NotRelevant,
        }
    }
}

/// One entry of a report's top concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptScore {
    pub concept_id: ConceptId,
    pub concept_label: String,
    pub level: RelevanceLevel,
    pub score: f64,
}

/// Assessment of one paper against the selected concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub run_id: Uuid,
    pub paper_id: PaperId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_title: Option<String>,
    pub status: ReportStatus,
    /// In concept processing order
    pub judgments: Vec<RelevanceJudgment>,
    pub aggregate_score: Option<f64>,
    pub verdict: Verdict,
    pub top_concepts: Vec<ConceptScore>,
    /// Root concepts with no positively scored concept in their subtree
    pub uncovered_roots: Vec<ConceptId>,
    /// Rubric breakdown over the positively scored concepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology_fit: Option<OntologyFit>,
    #[serde(default)]
    pub reasoned_paths: Vec<ReasonedPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl AssessmentReport {
    /// Report for a paper that could not be retrieved.
    pub fn failed(run_id: Uuid, paper_id: PaperId, failure: impl Into<String>) -> Self {
        Self {
            run_id,
            paper_id,
            paper_title: None,
            status: ReportStatus::Failed,
            judgments: Vec::new(),
            aggregate_score: None,
            verdict: Verdict::Undetermined,
            top_concepts: Vec::new(),
            uncovered_roots: Vec::new(),
            ontology_fit: None,
            reasoned_paths: Vec::new(),
            failure: Some(failure.into()),
            generated_at: Utc::now(),
        }
    }

    /// Report for a paper the run never reached because it was cancelled.
    pub fn cancelled(run_id: Uuid, paper_id: PaperId) -> Self {
        Self {
            status: ReportStatus::Cancelled,
            failure: None,
            ..Self::failed(run_id, paper_id, "")
        }
    }

    /// Aggregate judgments into a report.
    pub fn summarize(
        run_id: Uuid,
        paper: &Paper,
        judgments: Vec<RelevanceJudgment>,
        graph: &ConceptGraph,
        config: &PipelineConfig,
        cancelled: bool,
    ) -> Self {
        let scores: Vec<f64> = judgments.iter().filter_map(RelevanceJudgment::score).collect();
        let matched = matched_concepts(&judgments);
        let fit = OntologyFit::assess(graph, &matched, &paper.full_text());
        let aggregate_score = config.aggregation.aggregate(&scores, &fit);

        let status = if cancelled {
            ReportStatus::Cancelled
        } else if judgments.iter().any(|j| !j.is_scored()) {
            ReportStatus::Partial
        } else {
            ReportStatus::Complete
        };

        Self {
            run_id,
            paper_id: paper.id.clone(),
            paper_title: Some(paper.title.clone()),
            status,
            top_concepts: top_concepts(&judgments, config.top_k),
            uncovered_roots: uncovered_roots(&matched, graph),
            reasoned_paths: reasoned_paths(graph, &matched),
            ontology_fit: Some(fit),
            judgments,
            aggregate_score,
            verdict: Verdict::from_score(aggregate_score),
            failure: None,
            generated_at: Utc::now(),
        }
    }

    pub fn scored_count(&self) -> usize {
        self.judgments.iter().filter(|j| j.is_scored()).count()
    }

    pub fn unscored_count(&self) -> usize {
        self.judgments.len() - self.scored_count()
    }

    /// Anything short of a complete report
    pub fn is_partial(&self) -> bool {
        self.status != ReportStatus::Complete
    }
}

/// Highest-scoring judgments, ties kept in processing order.
fn top_concepts(judgments: &[RelevanceJudgment], top_k: usize) -> Vec<ConceptScore> {
    let mut scored: Vec<ConceptScore> = judgments
        .iter()
        .filter_map(|j| {
            Some(ConceptScore {
                concept_id: j.concept_id.clone(),
                concept_label: j.concept_label.clone(),
                level: j.level()?,
                score: j.score()?,
            })
        })
        .collect();
    // Stable sort keeps processing order among equal scores
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}

/// Concepts scored above zero
fn matched_concepts(judgments: &[RelevanceJudgment]) -> BTreeSet<ConceptId> {
    judgments
        .iter()
        .filter(|j| j.score().is_some_and(|s| s > 0.0))
        .map(|j| j.concept_id.clone())
        .collect()
}

fn uncovered_roots(matched: &BTreeSet<ConceptId>, graph: &ConceptGraph) -> Vec<ConceptId> {
    let covered: BTreeSet<ConceptId> = matched
        .iter()
        .filter_map(|id| graph.roots_of(id).ok())
        .flatten()
        .collect();

    graph
        .roots()
        .iter()
        .filter(|root| !covered.contains(*root))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Concept;
    use crate::pipeline::AggregationRule;
    use crate::scoring::{RetrievalContext, ScoreScale};

    fn graph() -> ConceptGraph {
        ConceptGraph::build(vec![
            Concept::new("A", "disease"),
            Concept::new("B", "influenza").is_a("A"),
            Concept::new("H", "host"),
        ])
        .unwrap()
    }

    fn judgment(paper: &Paper, id: &str, level: Option<RelevanceLevel>) -> RelevanceJudgment {
        let context = RetrievalContext::new(Concept::new(id, id.to_lowercase()), Vec::new());
        match level {
            Some(level) => {
                RelevanceJudgment::scored(paper, &context, level, &ScoreScale::default(), None)
            }
            None => RelevanceJudgment::unscored(paper, &context, "unparsable", 3),
        }
    }

    #[test]
    fn verdict_thresholds() {
        assert_eq!(Verdict::from_score(Some(0.7)), Verdict::Relevant);
        assert_eq!(Verdict::from_score(Some(0.69)), Verdict::PartiallyRelevant);
        assert_eq!(Verdict::from_score(Some(0.3)), Verdict::PartiallyRelevant);
        assert_eq!(Verdict::from_score(Some(0.0)), Verdict::NotRelevant);
        assert_eq!(Verdict::from_score(None), Verdict::Undetermined);
    }

    #[test]
    fn complete_report_aggregates_and_ranks() {
        let paper = Paper::new("p", "Flu", "influenza");
        let judgments = vec![
            judgment(&paper, "A", Some(RelevanceLevel::Relevant)),
            judgment(&paper, "B", Some(RelevanceLevel::HighlyRelevant)),
            judgment(&paper, "H", Some(RelevanceLevel::NotRelevant)),
        ];
        let report = AssessmentReport::summarize(
            Uuid::new_v4(),
            &paper,
            judgments,
            &graph(),
            &PipelineConfig::default(),
            false,
        );

        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.aggregate_score, Some(1.0));
        assert_eq!(report.verdict, Verdict::Relevant);
        assert_eq!(report.top_concepts[0].concept_id, ConceptId::from("B"));
        assert_eq!(report.top_concepts[1].concept_id, ConceptId::from("A"));
        assert_eq!(report.uncovered_roots, vec![ConceptId::from("H")]);
        assert!(!report.is_partial());

        // A and B matched; H scored zero and stays out of the rubric
        let fit = report.ontology_fit.unwrap();
        assert_eq!(fit.matched, 2);
        assert!((fit.graph_coherence - 15.0).abs() < 1e-9);
        assert!(report.reasoned_paths.is_empty());
    }

    #[test]
    fn ontology_fit_rule_drives_the_verdict() {
        let paper = Paper::new("p", "Flu", "influenza and disease");
        let judgments = vec![
            judgment(&paper, "A", Some(RelevanceLevel::HighlyRelevant)),
            judgment(&paper, "B", Some(RelevanceLevel::HighlyRelevant)),
        ];
        let config = PipelineConfig {
            aggregation: AggregationRule::OntologyFit,
            ..PipelineConfig::default()
        };
        let report =
            AssessmentReport::summarize(Uuid::new_v4(), &paper, judgments, &graph(), &config, false);

        // coverage 12, hierarchy 10/3, coherence 15, terminology 10, evidence 5
        let expected = (12.0 + 10.0 / 3.0 + 15.0 + 10.0 + 5.0) / 100.0;
        let score = report.aggregate_score.unwrap();
        assert!((score - expected).abs() < 1e-9);
        assert_eq!(report.verdict, Verdict::PartiallyRelevant);
    }

    #[test]
    fn unscored_judgment_makes_report_partial() {
        let paper = Paper::new("p", "Flu", "influenza");
        let judgments = vec![
            judgment(&paper, "A", Some(RelevanceLevel::WeaklyRelevant)),
            judgment(&paper, "B", None),
        ];
        let report = AssessmentReport::summarize(
            Uuid::new_v4(),
            &paper,
            judgments,
            &graph(),
            &PipelineConfig::default(),
            false,
        );
        assert_eq!(report.status, ReportStatus::Partial);
        assert_eq!(report.scored_count(), 1);
        assert_eq!(report.unscored_count(), 1);
        assert_eq!(report.aggregate_score, Some(0.33));
        assert_eq!(report.verdict, Verdict::PartiallyRelevant);
    }

    #[test]
    fn nothing_scored_is_undetermined() {
        let paper = Paper::new("p", "Flu", "influenza");
        let report = AssessmentReport::summarize(
            Uuid::new_v4(),
            &paper,
            vec![judgment(&paper, "A", None)],
            &graph(),
            &PipelineConfig::default(),
            false,
        );
        assert_eq!(report.aggregate_score, None);
        assert_eq!(report.verdict, Verdict::Undetermined);
        assert_eq!(
            report.uncovered_roots,
            vec![ConceptId::from("A"), ConceptId::from("H")]
        );
    }

    #[test]
    fn failed_report_serializes_status() {
        let report = AssessmentReport::failed(Uuid::new_v4(), PaperId::from("9"), "unavailable");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["verdict"], "undetermined");
        assert_eq!(json["failure"], "unavailable");
        assert!(json.get("paper_title").is_none());
        assert!(json.get("ontology_fit").is_none());
        assert_eq!(json["reasoned_paths"], serde_json::json!([]));
    }
}
