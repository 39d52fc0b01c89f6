//! Document parse stream: SSE records dispatched to typed handlers

use super::decode::RecordBuffer;
use super::session::StreamState;
use super::sse::ParseEvent;
use super::transport::{StreamRequest, Transport};
use super::ApiError;
use futures_util::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Callbacks for a parse session. Unimplemented methods ignore their event.
///
/// `on_close` runs exactly once, after every record has been dispatched,
/// however the session ends.
pub trait ParseHandler: Send + 'static {
    fn on_status(&mut self, _data: Value) {}
    fn on_progress(&mut self, _data: Value) {}
    fn on_chunk(&mut self, _data: Value) {}
    fn on_result(&mut self, _data: Value) {}
    fn on_error(&mut self, _data: Value) {}
    fn on_close(&mut self) {}
}

/// Forward every event into a channel, ending with [`ParseEvent::Closed`]
impl ParseHandler for mpsc::UnboundedSender<ParseEvent> {
    fn on_status(&mut self, data: Value) {
        let _ = self.send(ParseEvent::Status(data));
    }

    fn on_progress(&mut self, data: Value) {
        let _ = self.send(ParseEvent::Progress(data));
    }

    fn on_chunk(&mut self, data: Value) {
        let _ = self.send(ParseEvent::Chunk(data));
    }

    fn on_result(&mut self, data: Value) {
        let _ = self.send(ParseEvent::Result(data));
    }

    fn on_error(&mut self, data: Value) {
        let _ = self.send(ParseEvent::Error(data));
    }

    fn on_close(&mut self) {
        let _ = self.send(ParseEvent::Closed);
    }
}

/// An in-flight parse stream
pub struct ParseSession {
    cancel: CancellationToken,
    state: watch::Receiver<StreamState>,
    done: JoinHandle<Result<(), ApiError>>,
}

impl ParseSession {
    /// Stop reading. Safe to call any number of times, including after the
    /// stream has finished.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for the session to settle. Aborting settles with `Ok`.
    pub async fn done(self) -> Result<(), ApiError> {
        match self.done.await {
            Ok(result) => result,
            Err(e) => Err(ApiError::Stream(format!("parse task ended abnormally: {}", e))),
        }
    }
}

enum Completion {
    Finished,
    Aborted,
}

pub(crate) fn spawn_parse<H: ParseHandler>(
    transport: Arc<dyn Transport>,
    request: StreamRequest,
    handler: H,
    cancel: CancellationToken,
) -> ParseSession {
    let (state_tx, state_rx) = watch::channel(StreamState::Idle);
    let task_cancel = cancel.clone();
    let done = tokio::spawn(run_parse(transport, request, handler, task_cancel, state_tx));

    ParseSession {
        cancel,
        state: state_rx,
        done,
    }
}

async fn run_parse<H: ParseHandler>(
    transport: Arc<dyn Transport>,
    request: StreamRequest,
    mut handler: H,
    cancel: CancellationToken,
    state: watch::Sender<StreamState>,
) -> Result<(), ApiError> {
    let result = read_events(transport.as_ref(), request, &mut handler, &cancel, &state).await;

    let terminal = match &result {
        Ok(Completion::Finished) => StreamState::Closed,
        Ok(Completion::Aborted) => StreamState::Aborted,
        Err(e) => {
            warn!(error = %e, "parse stream failed");
            StreamState::Failed
        }
    };
    state.send_modify(|s| {
        s.advance(terminal);
    });
    debug!(state = ?terminal, "parse stream settled");

    // Handlers see the settled state from inside on_close
    handler.on_close();

    result.map(|_| ())
}

async fn read_events<H: ParseHandler>(
    transport: &dyn Transport,
    request: StreamRequest,
    handler: &mut H,
    cancel: &CancellationToken,
    state: &watch::Sender<StreamState>,
) -> Result<Completion, ApiError> {
    debug!(url = %request.url, "opening parse stream");

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(Completion::Aborted),
        response = transport.send(request) => response?,
    };

    if !response.is_success() {
        return Err(ApiError::Status {
            status: response.status,
            message: format!("parse request failed: HTTP {}", response.status),
        });
    }
    let Some(mut body) = response.body else {
        return Err(ApiError::StreamingUnsupported);
    };

    state.send_modify(|s| {
        s.advance(StreamState::Streaming);
    });

    let mut buffer = RecordBuffer::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Completion::Aborted),
            next = body.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                buffer.push(&bytes);
                while let Some(record) = buffer.next_record() {
                    dispatch(handler, &record);
                }
            }
            Some(Err(e)) => return Err(e),
            None => break,
        }
    }

    if let Some(rest) = buffer.finish() {
        dispatch(handler, &rest);
    }

    Ok(Completion::Finished)
}

fn dispatch<H: ParseHandler>(handler: &mut H, block: &str) {
    match ParseEvent::from_block(block) {
        Some(ParseEvent::Status(data)) => handler.on_status(data),
        Some(ParseEvent::Progress(data)) => handler.on_progress(data),
        Some(ParseEvent::Chunk(data)) => handler.on_chunk(data),
        Some(ParseEvent::Result(data)) => handler.on_result(data),
        Some(ParseEvent::Error(data)) => handler.on_error(data),
        Some(ParseEvent::Closed) | None => {}
    }
}
