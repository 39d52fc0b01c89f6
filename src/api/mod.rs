//! Streaming client for the study-assistant backend
//!
//! Two streams share one transport and one credential source:
//! - document parsing, delivered as SSE records (`POST /docs/{id}/parse`)
//! - exercise generation, delivered as free text with a trailing JSON line
//!   (`POST /exercises/generate-from-text`)

mod client;
pub mod decode;
mod generate;
mod parse;
mod request;
mod response;
mod session;
pub mod sse;
mod transport;

pub use client::StudyClient;
pub use generate::{extract_control_tail, ControlTail, GenerateHandler};
pub use parse::{ParseHandler, ParseSession};
pub use request::{AnalyzeParams, GenerateFromTextParams};
pub use response::{AnalyzeForConfirmResponse, DocParsed, DocStatus, ParseOutcome, Usage};
pub use session::StreamState;
pub use sse::{EventRecord, ParseEvent};
pub use transport::{ByteStream, HttpTransport, StreamRequest, StreamResponse, Transport};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; `message` is what the user sees
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("streaming response not supported")]
    StreamingUnsupported,

    #[error("stream read failed: {0}")]
    Stream(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status when the server rejected the request
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
