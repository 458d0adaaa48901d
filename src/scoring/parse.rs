//! Strict parsing of model responses into relevance levels
//!
//! Accepted shapes, tried in order:
//! 1. a JSON object with a `relevance` field, either plain, inside a fenced
//!    code block, or embedded in surrounding prose
//! 2. a `Relevance: <label>` line, with an optional `Rationale: ...` line
//!
//! Anything else is a parse error. Nothing is guessed from free text.

use super::scale::{RelevanceLevel, ScoreScale};
use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// A successfully parsed model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub level: RelevanceLevel,
    pub rationale: Option<String>,
}

/// Extract a JSON object from LLM response text.
///
/// Models often wrap JSON in markdown code fences or add prose around it.
fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        if v.is_object() {
            return Some(v);
        }
    }

    let fenced = if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        after.find("```").map(|end| &after[..end])
    } else if let Some(start) = trimmed.find("```\n") {
        let after = &trimmed[start + 4..];
        after.find("```").map(|end| &after[..end])
    } else {
        None
    };

    if let Some(block) = fenced {
        if let Ok(v) = serde_json::from_str::<Value>(block.trim()) {
            if v.is_object() {
                return Some(v);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                if v.is_object() {
                    return Some(v);
                }
            }
        }
    }

    None
}

fn level_from_number(value: f64, scale: &ScoreScale) -> Result<RelevanceLevel, String> {
    if (0.0..=1.0).contains(&value) {
        Ok(scale.nearest(value))
    } else {
        Err(format!("relevance score {} is outside [0, 1]", value))
    }
}

fn level_from_json(object: &Value, scale: &ScoreScale) -> Result<RelevanceLevel, String> {
    let field = object
        .get("relevance")
        .or_else(|| object.get("score"))
        .ok_or_else(|| "JSON response has no relevance field".to_string())?;

    match field {
        Value::String(label) => match RelevanceLevel::from_label(label) {
            Some(level) => Ok(level),
            None => match label.trim().parse::<f64>() {
                Ok(value) => level_from_number(value, scale),
                Err(_) => Err(format!("unrecognized relevance label: {:?}", label)),
            },
        },
        Value::Number(n) => {
            let value = n
                .as_f64()
                .ok_or_else(|| format!("relevance score {} is not a number", n))?;
            level_from_number(value, scale)
        }
        other => Err(format!("relevance field has unexpected type: {}", other)),
    }
}

fn relevance_line() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?im)^[\s*#>-]*relevance[\s*]*:[\s*]*([^\n]+)$").ok())
        .as_ref()
}

fn rationale_line() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?im)^[\s*#>-]*(?:rationale|justification)[\s*]*:[\s*]*([^\n]+)$").ok()
        })
        .as_ref()
}

/// Match a label at the start of `rest`, preferring the longest one
/// ("highly relevant" over "relevant").
fn leading_label(rest: &str) -> Option<RelevanceLevel> {
    let words: Vec<&str> = rest.split_whitespace().collect();
    (1..=words.len().min(3))
        .rev()
        .find_map(|n| RelevanceLevel::from_label(&words[..n].join(" ")))
}

fn parse_lines(text: &str) -> Option<ParsedResponse> {
    let captures = relevance_line()?.captures(text)?;
    let level = leading_label(captures.get(1)?.as_str())?;
    let rationale = rationale_line()
        .and_then(|p| p.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|r| !r.is_empty());
    Some(ParsedResponse { level, rationale })
}

/// Parse a model response, mapping numeric scores onto `scale`.
///
/// A JSON object without a usable judgment falls back to the
/// `Relevance:` line format; its error is kept if that finds nothing either.
pub fn parse_response(text: &str, scale: &ScoreScale) -> Result<ParsedResponse, String> {
    let json_error = match extract_json(text).map(|object| parse_object(&object, scale)) {
        Some(Ok(parsed)) => return Ok(parsed),
        Some(Err(e)) => Some(e),
        None => None,
    };

    parse_lines(text).ok_or_else(|| {
        json_error.unwrap_or_else(|| {
            let preview: String = text.chars().take(80).collect();
            format!("no relevance judgment found in response: {:?}", preview)
        })
    })
}

fn parse_object(object: &Value, scale: &ScoreScale) -> Result<ParsedResponse, String> {
    let level = level_from_json(object, scale)?;
    let rationale = object
        .get("rationale")
        .or_else(|| object.get("justification"))
        .and_then(Value::as_str)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    Ok(ParsedResponse { level, rationale })
}
