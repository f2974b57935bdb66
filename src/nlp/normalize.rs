use serde_json::{Map, Value};
use tracing::warn;

use crate::core::model::{Category, DetectedError};

const PHRASE_FIELDS: [&str; 3] = ["original", "error", "message"];
const CATEGORY_FIELDS: [&str; 2] = ["type", "category"];

/// Shapes the language model has been seen to answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    List(Vec<Value>),
    Keyed(Map<String, Value>),
    Scalar(Value),
}

impl From<Value> for RawResponse {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => RawResponse::List(items),
            Value::Object(map) => RawResponse::Keyed(map),
            other => RawResponse::Scalar(other),
        }
    }
}

impl RawResponse {
    pub fn candidates(self) -> Vec<Value> {
        match self {
            RawResponse::List(items) => items,
            RawResponse::Keyed(map) => {
                let nested = map.values().find_map(|value| match value {
                    Value::Array(items) if !items.is_empty() => Some(items.clone()),
                    Value::Array(_) => Some(Vec::new()),
                    _ => None,
                });
                match nested {
                    Some(items) if !items.is_empty() => items,
                    _ => vec![Value::Object(map)],
                }
            }
            RawResponse::Scalar(_) => Vec::new(),
        }
    }
}

/// Parses the raw response text; unparseable text yields no errors.
pub fn normalize_response(raw: &str) -> Vec<DetectedError> {
    match serde_json::from_str::<Value>(strip_code_fence(raw)) {
        Ok(value) => normalize_value(value),
        Err(err) => {
            warn!(error = %err, "language model returned malformed JSON; ignoring response");
            Vec::new()
        }
    }
}

pub fn normalize_value(value: Value) -> Vec<DetectedError> {
    RawResponse::from(value)
        .candidates()
        .iter()
        .filter_map(normalize_candidate)
        .collect()
}

fn normalize_candidate(candidate: &Value) -> Option<DetectedError> {
    let record = candidate.as_object()?;
    let original = PHRASE_FIELDS
        .iter()
        .find_map(|field| record.get(*field).and_then(phrase_text))?;
    let category = CATEGORY_FIELDS
        .iter()
        .find_map(|field| record.get(*field))
        .map(category_of)
        .unwrap_or(Category::Grammar);
    Some(DetectedError { original, category })
}

fn phrase_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn category_of(value: &Value) -> Category {
    let value = match value {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Category::Grammar,
        },
        other => other,
    };
    let raw = match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };
    let head = raw.split(['/', ',']).next().unwrap_or_default();
    Category::coerce(head)
}

/// Drops a surrounding Markdown code fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    let body = body.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    body.trim()
}
