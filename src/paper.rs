//! Paper records and the text excerpts handed to the scorer

use serde::{Deserialize, Serialize};

/// Unique identifier for a paper
///
/// Serializes as a plain string; numeric ids from upstream APIs are
/// stringified on load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PaperId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PaperId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for PaperId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// Bibliographic metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Where the record came from (API name, file path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mesh_terms: Vec<String>,
}

/// A paper under assessment. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    /// Abstract or full-text excerpt
    pub abstract_text: String,
    #[serde(default)]
    pub metadata: PaperMetadata,
}

/// Paragraphs longer than this are split in half
const MAX_CHUNK_WORDS: usize = 200;

impl Paper {
    pub fn new(
        id: impl Into<PaperId>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            metadata: PaperMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: PaperMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Title and abstract joined, the text that concept mentions are matched against
    pub fn full_text(&self) -> String {
        match (self.title.trim().is_empty(), self.abstract_text.trim().is_empty()) {
            (true, _) => self.abstract_text.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{} {}", self.title, self.abstract_text),
        }
    }

    /// Abstract split into paragraph chunks
    pub fn chunks(&self) -> Vec<String> {
        split_into_chunks(&self.abstract_text, MAX_CHUNK_WORDS)
    }

    /// Leading abstract chunks, kept whole, up to `max_words` words.
    ///
    /// The first chunk is always included (truncated to `max_words`) so a
    /// single long paragraph still yields an excerpt.
    pub fn excerpt(&self, max_words: usize) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut used = 0usize;
        for chunk in self.chunks() {
            let words = chunk.split_whitespace().count();
            if parts.is_empty() && words > max_words {
                let truncated: Vec<&str> = chunk.split_whitespace().take(max_words).collect();
                parts.push(truncated.join(" "));
                break;
            }
            if used + words > max_words {
                break;
            }
            used += words;
            parts.push(chunk);
        }
        parts.join("\n\n")
    }
}

/// Split text on blank lines into paragraphs; paragraphs longer than
/// `max_words` are split into two roughly equal halves.
pub fn split_into_chunks(text: &str, max_words: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let mut flush = |paragraph: &mut Vec<&str>| {
        let joined = paragraph.join("\n");
        paragraph.clear();
        let words: Vec<&str> = joined.split_whitespace().collect();
        if words.is_empty() {
            return;
        }
        if words.len() > max_words {
            let mid = words.len() / 2;
            chunks.push(words[..mid].join(" "));
            chunks.push(words[mid..].join(" "));
        } else {
            chunks.push(joined.trim().to_string());
        }
    };

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut paragraph);
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph);

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_id_from_number_is_stringified() {
        assert_eq!(PaperId::from(1000u64).as_str(), "1000");
        let json = serde_json::to_string(&PaperId::from("p-1")).unwrap();
        assert_eq!(json, "\"p-1\"");
    }

    #[test]
    fn chunks_split_on_blank_lines() {
        let chunks = split_into_chunks("First paragraph.\n\n  \nSecond\nparagraph.", 200);
        assert_eq!(chunks, vec!["First paragraph.", "Second\nparagraph."]);
    }

    #[test]
    fn long_paragraphs_are_halved() {
        let text = (0..10).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = split_into_chunks(&text, 4);
        assert_eq!(chunks, vec!["w0 w1 w2 w3 w4", "w5 w6 w7 w8 w9"]);
    }

    #[test]
    fn excerpt_keeps_whole_chunks_within_budget() {
        let paper = Paper::new("p", "t", "one two three\n\nfour five\n\nsix seven eight nine");
        assert_eq!(paper.excerpt(5), "one two three\n\nfour five");
        assert_eq!(paper.excerpt(2), "one two");
    }

    #[test]
    fn full_text_skips_empty_parts() {
        assert_eq!(Paper::new("p", "", "abstract").full_text(), "abstract");
        assert_eq!(Paper::new("p", "Title", "").full_text(), "Title");
        assert_eq!(Paper::new("p", "Title", "abstract").full_text(), "Title abstract");
    }
}
