//! Relevance levels and the numeric scale they map onto

use serde::{Deserialize, Serialize};

/// Categorical relevance of a paper to a concept, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelevanceLevel {
    NotRelevant,
    WeaklyRelevant,
    Relevant,
    HighlyRelevant,
}

impl RelevanceLevel {
    pub const ALL: [RelevanceLevel; 4] = [
        RelevanceLevel::NotRelevant,
        RelevanceLevel::WeaklyRelevant,
        RelevanceLevel::Relevant,
        RelevanceLevel::HighlyRelevant,
    ];

    /// Human-readable label, as used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            RelevanceLevel::NotRelevant => "not relevant",
            RelevanceLevel::WeaklyRelevant => "weakly relevant",
            RelevanceLevel::Relevant => "relevant",
            RelevanceLevel::HighlyRelevant => "highly relevant",
        }
    }

    /// Parse a label as a model might write it.
    ///
    /// Case, surrounding punctuation and `-`/`_` separators are ignored.
    pub fn from_label(text: &str) -> Option<Self> {
        let normalized = text
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
            .replace(['-', '_'], " ");
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        match normalized.as_str() {
            "not relevant" | "irrelevant" | "none" => Some(RelevanceLevel::NotRelevant),
            "weakly relevant" | "partially relevant" | "somewhat relevant" | "low" => {
                Some(RelevanceLevel::WeaklyRelevant)
            }
            "relevant" | "moderately relevant" | "medium" => Some(RelevanceLevel::Relevant),
            "highly relevant" | "very relevant" | "high" => Some(RelevanceLevel::HighlyRelevant),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelevanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric score for each relevance level.
///
/// One scale applies to a whole run so scores are comparable across concepts
/// and papers. Values must lie in `[0, 1]` and strictly increase with level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreScale {
    pub not_relevant: f64,
    pub weakly_relevant: f64,
    pub relevant: f64,
    pub highly_relevant: f64,
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self {
            not_relevant: 0.0,
            weakly_relevant: 0.33,
            relevant: 0.67,
            highly_relevant: 1.0,
        }
    }
}

impl ScoreScale {
    pub fn score(&self, level: RelevanceLevel) -> f64 {
        match level {
            RelevanceLevel::NotRelevant => self.not_relevant,
            RelevanceLevel::WeaklyRelevant => self.weakly_relevant,
            RelevanceLevel::Relevant => self.relevant,
            RelevanceLevel::HighlyRelevant => self.highly_relevant,
        }
    }

    /// Level whose score is closest to `value`. Ties go to the lower level.
    pub fn nearest(&self, value: f64) -> RelevanceLevel {
        let mut best = RelevanceLevel::NotRelevant;
        let mut best_distance = f64::INFINITY;
        for level in RelevanceLevel::ALL {
            let distance = (self.score(level) - value).abs();
            if distance < best_distance {
                best = level;
                best_distance = distance;
            }
        }
        best
    }

    pub fn validate(&self) -> Result<(), String> {
        let values = RelevanceLevel::ALL.map(|level| self.score(level));
        if let Some(bad) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(format!("score scale value {} is outside [0, 1]", bad));
        }
        if values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(format!(
                "score scale must strictly increase with relevance level, got {:?}",
                values
            ));
        }
        Ok(())
    }
}
