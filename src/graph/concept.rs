//! Concept records: the nodes of the ontology graph

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for a concept
///
/// Serializes as a plain string (full IRI or a short id like "obo:IDO_0000436")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    /// Create a ConceptId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path or fragment segment of an IRI, used when a concept has no label
    pub fn local_name(&self) -> &str {
        self.0
            .rsplit(|c| c == '/' || c == '#')
            .next()
            .unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConceptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConceptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Types of relationships between concepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    /// Hierarchical: "X is a Y" (subClassOf). Points from child to parent.
    IsA,
    /// Compositional: "X is part of Y"
    PartOf,
    /// General semantic relation
    RelatedTo,
    /// Equivalent classes
    EquivalentTo,
}

impl RelationType {
    /// All relation types, in declaration order
    pub const ALL: [RelationType; 4] = [
        RelationType::IsA,
        RelationType::PartOf,
        RelationType::RelatedTo,
        RelationType::EquivalentTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::IsA => "is-a",
            RelationType::PartOf => "part-of",
            RelationType::RelatedTo => "related-to",
            RelationType::EquivalentTo => "equivalent-to",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "is-a" | "subclassof" => Ok(RelationType::IsA),
            "part-of" => Ok(RelationType::PartOf),
            "related-to" => Ok(RelationType::RelatedTo),
            "equivalent-to" | "equivalentclass" => Ok(RelationType::EquivalentTo),
            other => Err(format!("unknown relation type: {}", other)),
        }
    }
}

/// A typed edge owned by its source concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Type of relationship
    #[serde(rename = "type")]
    pub relation: RelationType,
    /// Target concept
    pub target: ConceptId,
}

impl Relation {
    pub fn new(relation: RelationType, target: impl Into<ConceptId>) -> Self {
        Self {
            relation,
            target: target.into(),
        }
    }
}

/// A concept in the ontology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identifier
    pub id: ConceptId,
    /// Human-readable label (rdfs:label)
    #[serde(default)]
    pub label: String,
    /// Textual definition or comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    /// Alternate labels and exact synonyms
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    /// Outgoing typed relations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl Concept {
    /// Create a new concept with the given id and label
    pub fn new(id: impl Into<ConceptId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            definition: None,
            synonyms: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the definition
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Add a synonym
    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    /// Add an outgoing relation
    pub fn with_relation(mut self, relation: RelationType, target: impl Into<ConceptId>) -> Self {
        self.relations.push(Relation::new(relation, target));
        self
    }

    /// Shorthand for an `is-a` relation to a parent
    pub fn is_a(self, parent: impl Into<ConceptId>) -> Self {
        self.with_relation(RelationType::IsA, parent)
    }

    /// Label, falling back to the id's local name when the record has none
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            self.id.local_name()
        } else {
            &self.label
        }
    }

    /// Labels and synonyms that identify this concept in free text
    pub fn surface_forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.display_label())
            .chain(self.synonyms.iter().map(String::as_str))
            .filter(|s| !s.trim().is_empty())
    }

    /// Whole-word patterns for each distinct surface form, lowercased.
    /// Match them against lowercased text.
    pub(crate) fn mention_patterns(&self) -> Vec<Regex> {
        let mut seen = BTreeSet::new();
        self.surface_forms()
            .map(|form| form.trim().to_lowercase())
            .filter(|form| seen.insert(form.clone()))
            .filter_map(|form| Regex::new(&format!(r"\b{}\b", regex_lite::escape(&form))).ok())
            .collect()
    }

    /// Whether the label or a synonym occurs in `text` as a whole word,
    /// ignoring case
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.mention_patterns().iter().any(|p| p.is_match(&haystack))
    }

    /// Text used when presenting this concept as retrieval context:
    /// label, definition and synonyms.
    pub fn context_text(&self) -> String {
        let mut text = self.display_label().to_string();
        if let Some(definition) = &self.definition {
            text.push_str(". ");
            text.push_str(definition);
        }
        if !self.synonyms.is_empty() {
            text.push_str(". Synonyms: ");
            text.push_str(&self.synonyms.join(", "));
        }
        text
    }
}
