//! Server-Sent Events (SSE) records for the document parse stream
//!
//! A record is one blank-line-delimited block:
//! - `event: <name>` names the record (last one wins, default `message`)
//! - `data: <text>` lines are trimmed and joined with `\n`
//!
//! Records without data never reach a handler.

use serde_json::Value;
use tracing::trace;

/// Event name used when a record carries no `event:` line
pub const DEFAULT_EVENT: &str = "message";

/// One decoded SSE record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event: String,
    pub data: String,
}

impl EventRecord {
    /// Parse a record block. Returns None when the block has no data.
    pub fn parse(block: &str) -> Option<Self> {
        let mut event: Option<&str> = None;
        let mut data: Vec<&str> = Vec::new();

        for line in block.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(name) = line.strip_prefix("event:") {
                event = Some(name.trim());
            } else if let Some(value) = line.strip_prefix("data:") {
                data.push(value.trim());
            }
        }

        let data = data.join("\n");
        if data.is_empty() {
            return None;
        }

        Some(Self {
            event: event.unwrap_or(DEFAULT_EVENT).to_string(),
            data,
        })
    }

    /// The data as JSON, or the raw text when it is not valid JSON
    pub fn payload(&self) -> Value {
        serde_json::from_str(&self.data).unwrap_or_else(|_| Value::String(self.data.clone()))
    }
}

/// Events surfaced by a parse session
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    /// `{docId, status: "parsing"}`
    Status(Value),
    /// `{stage}`
    Progress(Value),
    /// `{content}`
    Chunk(Value),
    /// `{docId, status: "done", parsed}`
    Result(Value),
    /// `{docId, status: "failed", detail}`
    Error(Value),
    /// The session ended; always the last event
    Closed,
}

impl ParseEvent {
    /// Route a record by event name. Unknown names are dropped.
    pub fn from_record(record: &EventRecord) -> Option<Self> {
        let payload = record.payload();
        let event = match record.event.as_str() {
            "status" => ParseEvent::Status(payload),
            "progress" => ParseEvent::Progress(payload),
            "chunk" => ParseEvent::Chunk(payload),
            "result" => ParseEvent::Result(payload),
            "error" => ParseEvent::Error(payload),
            other => {
                trace!(event = other, "dropping unrecognized parse event");
                return None;
            }
        };
        Some(event)
    }

    /// Parse a raw block straight into an event
    pub fn from_block(block: &str) -> Option<Self> {
        EventRecord::parse(block).as_ref().and_then(Self::from_record)
    }
}
