//! Lifecycle state shared by the streaming clients

use serde::Serialize;
use tracing::debug;

/// Where a stream is in its lifecycle.
///
/// `Idle -> Streaming -> {Closed | Failed | Aborted}`; a stream can also fail or
/// be aborted before any body arrives. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    Streaming,
    Closed,
    Failed,
    Aborted,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Closed | StreamState::Failed | StreamState::Aborted)
    }

    fn can_advance_to(self, next: StreamState) -> bool {
        use StreamState::*;
        matches!(
            (self, next),
            (Idle, Streaming) | (Idle, Failed) | (Idle, Aborted)
                | (Streaming, Closed) | (Streaming, Failed) | (Streaming, Aborted)
        )
    }

    /// Move to `next` if the transition is legal. Returns whether it happened.
    pub fn advance(&mut self, next: StreamState) -> bool {
        if !self.can_advance_to(next) {
            debug!(from = ?self, to = ?next, "ignoring stream state transition");
            return false;
        }
        *self = next;
        true
    }
}

impl Default for StreamState {
    fn default() -> Self {
        StreamState::Idle
    }
}
