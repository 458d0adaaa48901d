//! Pipeline configuration
//!
//! Read from YAML. Every field has a default, so a config file only needs
//! the settings it changes.

use super::fit::OntologyFit;
use crate::graph::{ConceptId, RelationType};
use crate::scoring::{ScoreScale, DEFAULT_EXCERPT_WORDS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which concepts a paper is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ConceptSelection {
    /// Every concept in the ontology
    All,
    /// Seed concepts, optionally expanded with their neighborhoods
    Seeds {
        seeds: Vec<ConceptId>,
        #[serde(default = "default_expand")]
        expand: bool,
    },
    /// Concepts mentioned in the paper text plus their neighborhoods
    Mentioned,
}

fn default_expand() -> bool {
    true
}

impl Default for ConceptSelection {
    fn default() -> Self {
        ConceptSelection::All
    }
}

/// Upper bound for `call_timeout_seconds`
pub const MAX_CALL_TIMEOUT: Duration = Duration::from_secs(86_400);

/// How judgment scores combine into one paper score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum AggregationRule {
    Max,
    Mean,
    /// Mean of the `k` highest scores
    TopKMean { k: usize },
    /// The ontology-fit rubric total, scaled to `[0, 1]`
    OntologyFit,
}

impl Default for AggregationRule {
    fn default() -> Self {
        AggregationRule::Max
    }
}

impl AggregationRule {
    /// `None` when there are no scores.
    pub fn aggregate(&self, scores: &[f64], fit: &OntologyFit) -> Option<f64> {
        if scores.is_empty() {
            return None;
        }
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        match self {
            AggregationRule::Max => scores.iter().copied().reduce(f64::max),
            AggregationRule::Mean => Some(mean(scores)),
            AggregationRule::TopKMean { k } => {
                let mut sorted = scores.to_vec();
                sorted.sort_by(|a, b| b.total_cmp(a));
                sorted.truncate((*k).max(1));
                Some(mean(&sorted))
            }
            AggregationRule::OntologyFit => Some(fit.score()),
        }
    }
}

/// Settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub concept_selection: ConceptSelection,
    /// Hops used for selection expansion and retrieval context
    pub traversal_depth: usize,
    /// Relation types followed during traversal
    pub relation_types: Vec<RelationType>,
    pub score_scale: ScoreScale,
    pub aggregation: AggregationRule,
    /// Judgments listed as a report's top concepts
    pub top_k: usize,
    pub max_concepts_per_paper: usize,
    /// Retries after the first failed attempt, for retrieval and scoring
    pub retry_count: u32,
    /// Base delay for exponential backoff between retries
    pub retry_backoff_ms: u64,
    pub call_timeout_seconds: f64,
    /// Concurrent scoring calls per paper; 1 scores sequentially
    pub parallelism: usize,
    /// Abstract words included in each prompt
    pub max_excerpt_words: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concept_selection: ConceptSelection::default(),
            traversal_depth: 1,
            relation_types: RelationType::ALL.to_vec(),
            score_scale: ScoreScale::default(),
            aggregation: AggregationRule::default(),
            top_k: 5,
            max_concepts_per_paper: 50,
            retry_count: 2,
            retry_backoff_ms: 100,
            call_timeout_seconds: 60.0,
            parallelism: 1,
            max_excerpt_words: DEFAULT_EXCERPT_WORDS,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `./ontoscope.yaml` or the user config directory, falling
    /// back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let candidates = [
            Some(PathBuf::from("ontoscope.yaml")),
            dirs::config_dir().map(|p| p.join("ontoscope/config.yaml")),
        ];

        for path in candidates.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.traversal_depth == 0 {
            return invalid("traversal_depth must be >= 1");
        }
        if self.relation_types.is_empty() {
            return invalid("relation_types must not be empty");
        }
        if self.max_concepts_per_paper == 0 {
            return invalid("max_concepts_per_paper must be >= 1");
        }
        if self.parallelism == 0 {
            return invalid("parallelism must be >= 1");
        }
        if self.max_excerpt_words == 0 {
            return invalid("max_excerpt_words must be >= 1");
        }
        if !(self.call_timeout_seconds > 0.0
            && self.call_timeout_seconds <= MAX_CALL_TIMEOUT.as_secs_f64())
        {
            return invalid("call_timeout_seconds must be positive and at most 86400");
        }
        if let AggregationRule::TopKMean { k: 0 } = self.aggregation {
            return invalid("top-k-mean aggregation needs k >= 1");
        }
        if let ConceptSelection::Seeds { seeds, .. } = &self.concept_selection {
            if seeds.is_empty() {
                return invalid("seed selection needs at least one seed");
            }
        }
        self.score_scale.validate().map_err(ConfigError::Invalid)
    }

    /// Per-call timeout. Values that `validate` rejects map to `MAX_CALL_TIMEOUT`.
    pub fn call_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.call_timeout_seconds)
            .ok()
            .filter(|limit| !limit.is_zero() && *limit <= MAX_CALL_TIMEOUT)
            .unwrap_or(MAX_CALL_TIMEOUT)
    }

    pub fn with_selection(mut self, selection: ConceptSelection) -> Self {
        self.concept_selection = selection;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_retries(mut self, retry_count: u32, backoff_ms: u64) -> Self {
        self.retry_count = retry_count;
        self.retry_backoff_ms = backoff_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid_and_round_trip() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = PipelineConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
concept_selection:
  mode: seeds
  seeds: ["obo:IDO_0000436"]
traversal_depth: 2
relation_types: [is-a, part-of]
aggregation:
  rule: top-k-mean
  k: 3
parallelism: 4
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.concept_selection,
            ConceptSelection::Seeds {
                seeds: vec![ConceptId::from("obo:IDO_0000436")],
                expand: true,
            }
        );
        assert_eq!(config.traversal_depth, 2);
        assert_eq!(config.relation_types, vec![RelationType::IsA, RelationType::PartOf]);
        assert_eq!(config.aggregation, AggregationRule::TopKMean { k: 3 });
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.max_excerpt_words, DEFAULT_EXCERPT_WORDS);
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = PipelineConfig::from_yaml_str("traversal_depth: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PipelineConfig::from_yaml_str("parallelism: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PipelineConfig::from_yaml_str("call_timeout_seconds: -1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let yaml = "score_scale:\n  not_relevant: 0.5\n  weakly_relevant: 0.4\n";
        let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let yaml = "concept_selection:\n  mode: seeds\n  seeds: []\n";
        assert!(PipelineConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn unknown_selection_mode_is_parse_error() {
        let err = PipelineConfig::from_yaml_str("concept_selection:\n  mode: random\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn from_file_reads_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "top_k: 3\nretry_backoff_ms: 5").unwrap();
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.retry_backoff_ms, 5);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = PipelineConfig::from_file("/nonexistent/ontoscope.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn aggregation_rules() {
        let scores = [0.0, 0.33, 1.0, 0.67];
        let fit = OntologyFit {
            total: 40.0,
            ..OntologyFit::default()
        };
        assert_eq!(AggregationRule::Max.aggregate(&scores, &fit), Some(1.0));
        let mean = AggregationRule::Mean.aggregate(&scores, &fit).unwrap();
        assert!((mean - 0.5).abs() < 1e-9);
        let top2 = AggregationRule::TopKMean { k: 2 }.aggregate(&scores, &fit).unwrap();
        assert!((top2 - 0.835).abs() < 1e-9);
        assert_eq!(AggregationRule::OntologyFit.aggregate(&scores, &fit), Some(0.4));
        assert_eq!(AggregationRule::Max.aggregate(&[], &fit), None);
        assert_eq!(AggregationRule::OntologyFit.aggregate(&[], &fit), None);
    }

    #[test]
    fn ontology_fit_rule_parses() {
        let config = PipelineConfig::from_yaml_str("aggregation:\n  rule: ontology-fit\n").unwrap();
        assert_eq!(config.aggregation, AggregationRule::OntologyFit);
    }

    #[test]
    fn oversized_and_non_finite_timeouts_are_rejected() {
        for yaml in [
            "call_timeout_seconds: 1e20",
            "call_timeout_seconds: 86401",
            "call_timeout_seconds: .nan",
            "call_timeout_seconds: .inf",
            "call_timeout_seconds: 0",
        ] {
            let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{yaml} accepted");
        }
        assert!(PipelineConfig::from_yaml_str("call_timeout_seconds: 86400").is_ok());
    }

    #[test]
    fn call_timeout_never_panics_on_unvalidated_values() {
        for seconds in [1e20, -1.0, f64::NAN, f64::INFINITY, 0.0] {
            let config = PipelineConfig {
                call_timeout_seconds: seconds,
                ..PipelineConfig::default()
            };
            assert_eq!(config.call_timeout(), MAX_CALL_TIMEOUT);
        }
        let config = PipelineConfig {
            call_timeout_seconds: 2.5,
            ..PipelineConfig::default()
        };
        assert_eq!(config.call_timeout(), Duration::from_millis(2500));
    }
}
