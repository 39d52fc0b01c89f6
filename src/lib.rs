//! study-stream - Streaming client for the study-assistant backend
//!
//! Covers the two long-lived responses the backend produces:
//!
//! - **Document parsing**: SSE records (`status`, `progress`, `chunk`, `result`,
//!   `error`) dispatched to a [`ParseHandler`] from a cancellable [`ParseSession`]
//! - **Exercise generation**: free text forwarded chunk by chunk to a
//!   [`GenerateHandler`], with the trailing JSON control line (exercise id and
//!   token usage) split off once the stream ends
//!
//! Requests go through a [`Transport`] (reqwest by default) and carry a bearer
//! token from an injected [`CredentialProvider`].

pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;

pub use api::{
    extract_control_tail, AnalyzeForConfirmResponse, AnalyzeParams, ApiError, ControlTail,
    GenerateFromTextParams, GenerateHandler, HttpTransport, ParseEvent, ParseHandler,
    ParseSession, StreamState, StudyClient, Transport, Usage,
};
pub use auth::{Anonymous, CredentialProvider, EnvToken, StaticToken};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use metrics::UsageMetrics;
