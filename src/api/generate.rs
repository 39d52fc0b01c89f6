//! Exercise generation stream: live text with a trailing JSON control line
//!
//! Every decoded chunk goes to the caller as soon as it arrives. Only after
//! the body ends is the last line inspected; if it is a JSON object with a
//! string `exerciseId`, it is reported through `on_done` along with usage.
//! The control line must start on its own line; text glued to it on the
//! same line hides it.
//! Chunks already forwarded are never retracted, so a live view may briefly
//! show the raw control line.

use super::decode::Utf8Decoder;
use super::response::{error_message, Usage};
use super::session::StreamState;
use super::transport::{StreamRequest, Transport};
use super::ApiError;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

const GENERATE_FAILED: &str = "generation failed";

/// Callbacks for a generation stream
pub trait GenerateHandler: Send {
    /// Display text, in arrival order
    fn on_chunk(&mut self, text: &str);
    /// Stream finished; `exercise_id` is empty when no control line was found
    fn on_done(&mut self, exercise_id: &str, usage: Option<Usage>);
    fn on_error(&mut self, error: ApiError);
}

/// Metadata carried by the final line of a generation stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlTail {
    pub exercise_id: String,
    pub usage: Option<Usage>,
}

/// Look for a control line at the end of `text`
pub fn extract_control_tail(text: &str) -> ControlTail {
    let last = text.trim_end().lines().last().unwrap_or("").trim();

    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(last) else {
        return ControlTail::default();
    };
    let Some(exercise_id) = fields.get("exerciseId").and_then(Value::as_str) else {
        return ControlTail::default();
    };

    ControlTail {
        exercise_id: exercise_id.to_string(),
        usage: fields
            .get("usage")
            .filter(|usage| usage.is_object())
            .map(Usage::from_value),
    }
}

/// Run one generation stream and return the state it settled in
pub(crate) async fn run_generate<H: GenerateHandler + ?Sized>(
    transport: &dyn Transport,
    request: StreamRequest,
    handler: &mut H,
) -> StreamState {
    let mut state = StreamState::Idle;

    match stream_text(transport, request, handler, &mut state).await {
        Ok(text) => {
            let tail = extract_control_tail(&text);
            state.advance(StreamState::Closed);
            debug!(
                exercise_id = %tail.exercise_id,
                bytes = text.len(),
                state = ?state,
                "generation stream finished"
            );
            handler.on_done(&tail.exercise_id, tail.usage);
        }
        Err(e) => {
            state.advance(StreamState::Failed);
            warn!(error = %e, state = ?state, "generation stream failed");
            handler.on_error(e);
        }
    }

    state
}

/// Forward chunks as they arrive and return the full text
async fn stream_text<H: GenerateHandler + ?Sized>(
    transport: &dyn Transport,
    request: StreamRequest,
    handler: &mut H,
    state: &mut StreamState,
) -> Result<String, ApiError> {
    debug!(url = %request.url, "opening generation stream");
    let response = transport.send(request).await?;

    if !response.is_success() {
        let status = response.status;
        if status == 401 {
            warn!("generation request rejected: credentials not accepted");
        }
        let text = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status,
            message: error_message(&text, GENERATE_FAILED),
        });
    }
    let Some(mut body) = response.body else {
        return Err(ApiError::StreamingUnsupported);
    };

    state.advance(StreamState::Streaming);

    let mut decoder = Utf8Decoder::new();
    let mut buffer = String::new();
    while let Some(chunk) = body.next().await {
        let text = decoder.decode(&chunk?);
        // Only part of a character so far; it goes out with the next chunk
        if text.is_empty() {
            continue;
        }
        buffer.push_str(&text);
        handler.on_chunk(&text);
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        buffer.push_str(&rest);
        handler.on_chunk(&rest);
    }

    Ok(buffer)
}
