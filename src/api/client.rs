//! Client for the study-assistant backend's streaming endpoints

use super::generate::{run_generate, GenerateHandler};
use super::parse::{spawn_parse, ParseHandler, ParseSession};
use super::request::{AnalyzeParams, GenerateFromTextParams};
use super::session::StreamState;
use super::response::{error_message, AnalyzeForConfirmResponse};
use super::transport::{HttpTransport, StreamRequest, Transport};
use super::ApiError;
use crate::auth::{Anonymous, CredentialProvider, EnvToken, StaticToken};
use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Issues parse, generation and analysis requests.
///
/// Cloning is cheap; clones share the transport and credential source but
/// every stream they start is independent.
#[derive(Clone)]
pub struct StudyClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    request_timeout: Option<Duration>,
}

impl StudyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            transport: Arc::new(HttpTransport::new()),
            credentials: Arc::new(Anonymous),
            request_timeout: None,
        }
    }

    /// Build from configuration: base URL, timeout, and a token from the
    /// config file or the configured environment variable
    pub fn from_config(config: &Config) -> Self {
        let credentials: Arc<dyn CredentialProvider> = match &config.api.token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(EnvToken::new(config.api.token_env.clone())),
        };

        Self::new(config.api.base_url.clone())
            .with_credentials(credentials)
            .with_request_timeout(Duration::from_secs(config.api.request_timeout_secs))
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Timeout for plain request/response calls. Streams are never timed out.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> StreamRequest {
        StreamRequest::post(self.url(path)).bearer(&self.credentials.token())
    }

    /// Start parsing an uploaded document.
    ///
    /// Events go to `handler` from a spawned task, so this must be called
    /// inside a tokio runtime. Cancelling `external` has the same effect as
    /// [`ParseSession::abort`].
    pub fn start_parse<H: ParseHandler>(
        &self,
        doc_id: &str,
        handler: H,
        external: Option<&CancellationToken>,
    ) -> ParseSession {
        let request = self
            .post(&format!("/docs/{}/parse", doc_id))
            .header("Accept", "text/event-stream");
        let cancel = match external {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        debug!(doc_id, "starting parse session");
        spawn_parse(self.transport.clone(), request, handler, cancel)
    }

    /// Stream generated exercises for `params` into `handler`.
    ///
    /// Resolves once `on_done` or `on_error` has been called, returning
    /// `Closed` or `Failed` respectively; failures are only ever reported
    /// through `on_error`. Dropping the future stops the stream.
    pub async fn generate_from_text<H: GenerateHandler + ?Sized>(
        &self,
        params: &GenerateFromTextParams,
        handler: &mut H,
    ) -> StreamState {
        let body = match serde_json::to_value(params) {
            Ok(body) => body,
            Err(e) => {
                handler.on_error(e.into());
                return StreamState::Failed;
            }
        };
        let request = self
            .post("/exercises/generate-from-text")
            .header("Content-Type", "application/json")
            .json(body);

        run_generate(self.transport.as_ref(), request, handler).await
    }

    /// Ask the backend to analyze source text before generation
    pub async fn analyze_for_confirm(
        &self,
        params: &AnalyzeParams,
    ) -> Result<AnalyzeForConfirmResponse, ApiError> {
        let mut request = self
            .post("/exercises/analyze")
            .header("Content-Type", "application/json")
            .json(serde_json::to_value(params)?);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = self.transport.send(request).await?;
        let status = response.status;
        let success = response.is_success();
        let text = response.text().await?;

        if !success {
            if status == 401 {
                warn!("analysis request rejected: credentials not accepted");
            }
            return Err(ApiError::Status {
                status,
                message: error_message(&text, "analysis failed"),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
