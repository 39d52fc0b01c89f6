//! Response payloads from the study-assistant backend

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Token usage reported by a generation or analysis call.
///
/// The backend is loose about types here, so every field is coerced to a
/// count: numbers and numeric strings are taken as-is (fractions truncated),
/// `true` counts as 1, and anything else is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Normalize a usage object. Non-objects yield all zeros.
    pub fn from_value(value: &Value) -> Self {
        Self {
            input_tokens: coerce_count(value.get("inputTokens")),
            output_tokens: coerce_count(value.get("outputTokens")),
            total_tokens: coerce_count(value.get("totalTokens")),
        }
    }
}

impl<'de> Deserialize<'de> for Usage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Usage::from_value(&value))
    }
}

// Counts are unsigned: negatives clamp to 0 and only decimal notation is
// accepted, so "0x10" is 0 rather than 16.
fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(float_to_count))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0
            } else {
                s.parse::<f64>().map(float_to_count).unwrap_or(0)
            }
        }
        Some(Value::Bool(true)) => 1,
        _ => 0,
    }
}

fn float_to_count(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f.trunc() as u64
    } else {
        0
    }
}

/// User-facing message for a failed request body: the JSON `message` field,
/// else the raw text, else `fallback`.
pub(crate) fn error_message(body: &str, fallback: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or(fallback)
            .to_string(),
        Err(_) if body.trim().is_empty() => fallback.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Processing state of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Uploaded,
    Parsing,
    Done,
    Failed,
}

/// What the parser extracted from a course document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocParsed {
    pub school: String,
    pub major: String,
    pub course: String,
    pub knowledge_points: Vec<String>,
    pub summary: String,
}

/// Typed view of a `status`, `result` or `error` event payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    #[serde(default)]
    pub doc_id: String,
    pub status: Option<DocStatus>,
    pub parsed: Option<DocParsed>,
    /// Failure detail, passed through uninterpreted
    pub detail: Option<Value>,
}

impl ParseOutcome {
    /// Decode leniently; None when the payload is not a matching object
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// Analysis shown to the user before generation is confirmed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeForConfirmResponse {
    #[serde(default)]
    pub key_points: Vec<String>,
    pub question_type: Option<String>,
    pub question_type_label: Option<String>,
    pub difficulty: Option<String>,
    pub difficulty_label: Option<String>,
    pub count: Option<u32>,
    pub usage: Option<Usage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_numeric_strings() {
        let usage = Usage::from_value(&json!({
            "inputTokens": "10",
            "outputTokens": "5",
            "totalTokens": "15"
        }));
        assert_eq!(usage, Usage::new(10, 5, 15));
    }

    #[test]
    fn test_usage_invalid_fields_become_zero() {
        let usage = Usage::from_value(&json!({
            "inputTokens": "abc",
            "outputTokens": null,
            "totalTokens": -3
        }));
        assert_eq!(usage, Usage::default());
    }

    #[test]
    fn test_usage_only_decimal_non_negative_counts() {
        let usage = Usage::from_value(&json!({
            "inputTokens": "0x10",
            "outputTokens": "-7",
            "totalTokens": " 1.5e2 "
        }));
        assert_eq!(usage, Usage::new(0, 0, 150));
    }

    #[test]
    fn test_usage_missing_and_odd_types() {
        let usage = Usage::from_value(&json!({"inputTokens": 12.9, "outputTokens": true}));
        assert_eq!(usage, Usage::new(12, 1, 0));
        assert_eq!(Usage::from_value(&json!("nope")), Usage::default());
    }

    #[test]
    fn test_usage_serializes_camel_case() {
        let value = serde_json::to_value(Usage::new(1, 2, 3)).unwrap();
        assert_eq!(value, json!({"inputTokens": 1, "outputTokens": 2, "totalTokens": 3}));
    }

    #[test]
    fn test_error_message_sources() {
        assert_eq!(error_message(r#"{"message":"quota exceeded"}"#, "failed"), "quota exceeded");
        assert_eq!(error_message(r#"{"message":""}"#, "failed"), "failed");
        assert_eq!(error_message("upstream timeout", "failed"), "upstream timeout");
        assert_eq!(error_message("", "failed"), "failed");
    }

    #[test]
    fn test_parse_outcome_result() {
        let outcome = ParseOutcome::from_value(&json!({
            "docId": "d1",
            "status": "done",
            "parsed": {
                "school": "MIT",
                "course": "6.006",
                "knowledgePoints": ["heaps", "graphs"],
                "summary": "algorithms"
            }
        }))
        .expect("valid result payload");

        assert_eq!(outcome.status, Some(DocStatus::Done));
        let parsed = outcome.parsed.expect("parsed present");
        assert_eq!(parsed.knowledge_points, vec!["heaps", "graphs"]);
        assert_eq!(parsed.major, "");
    }

    #[test]
    fn test_parse_outcome_failed_keeps_detail() {
        let outcome = ParseOutcome::from_value(&json!({
            "docId": "d1",
            "status": "failed",
            "detail": {"code": 42}
        }))
        .unwrap();
        assert_eq!(outcome.status, Some(DocStatus::Failed));
        assert_eq!(outcome.detail, Some(json!({"code": 42})));
        assert!(ParseOutcome::from_value(&json!("raw text")).is_none());
    }

    #[test]
    fn test_analyze_response_with_loose_usage() {
        let response: AnalyzeForConfirmResponse = serde_json::from_value(json!({
            "keyPoints": ["limits"],
            "difficultyLabel": "Medium",
            "usage": {"inputTokens": "7", "outputTokens": 3, "totalTokens": "x"}
        }))
        .unwrap();
        assert_eq!(response.key_points, vec!["limits"]);
        assert_eq!(response.usage, Some(Usage::new(7, 3, 0)));
        assert_eq!(response.count, None);
    }
}
