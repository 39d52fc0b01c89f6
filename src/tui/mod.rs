//! Terminal presentation for the CLI

mod spinner;

pub use spinner::ParseSpinner;

use serde_json::Value;
use study_stream::api::{DocStatus, ParseOutcome};
use study_stream::ParseEvent;

/// What the CLI should do with a parse event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Update the spinner message
    Spinner(String),
    /// Print a line
    Line(String),
    /// Stop the spinner; the session is over
    Finish,
}

/// Map a parse event to terminal output
pub fn describe(event: &ParseEvent) -> Output {
    match event {
        ParseEvent::Status(data) => Output::Spinner(format!(
            "status: {}",
            field(data, "status").unwrap_or_else(|| text(data))
        )),
        ParseEvent::Progress(data) => Output::Spinner(format!(
            "stage: {}",
            field(data, "stage").unwrap_or_else(|| text(data))
        )),
        ParseEvent::Chunk(data) => {
            Output::Line(field(data, "content").unwrap_or_else(|| text(data)))
        }
        ParseEvent::Result(data) => Output::Line(describe_result(data)),
        ParseEvent::Error(data) => Output::Line(format!(
            "parse failed: {}",
            data.get("detail").map(text).unwrap_or_else(|| text(data))
        )),
        ParseEvent::Closed => Output::Finish,
    }
}

fn describe_result(data: &Value) -> String {
    let Some(outcome) = ParseOutcome::from_value(data) else {
        return format!("result: {}", text(data));
    };
    let Some(parsed) = outcome.parsed.filter(|_| outcome.status == Some(DocStatus::Done)) else {
        return format!("document {} finished without parsed content", outcome.doc_id);
    };

    let mut lines = vec![format!("document {} parsed", outcome.doc_id)];
    for (label, value) in [
        ("school", &parsed.school),
        ("major", &parsed.major),
        ("course", &parsed.course),
        ("summary", &parsed.summary),
    ] {
        if !value.is_empty() {
            lines.push(format!("  {}: {}", label, value));
        }
    }
    if !parsed.knowledge_points.is_empty() {
        lines.push("  knowledge points:".to_string());
        lines.extend(parsed.knowledge_points.iter().map(|p| format!("    - {}", p)));
    }
    lines.join("\n")
}

fn field(data: &Value, key: &str) -> Option<String> {
    data.get(key).map(text)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
