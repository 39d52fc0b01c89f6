//! HTTP transport with streaming response bodies
//!
//! The streaming clients only need "send a request, get a status and a byte
//! stream back". Keeping that behind a trait lets tests script exact chunk
//! boundaries without a server.

use super::decode::Utf8Decoder;
use super::ApiError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;

/// Response body delivered chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// A POST request issued by one of the clients
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl StreamRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach `Authorization: Bearer` unless the token is empty
    pub fn bearer(self, token: &str) -> Self {
        if token.is_empty() {
            self
        } else {
            self.header("Authorization", format!("Bearer {}", token))
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Case-insensitive header lookup
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status plus (maybe) a streaming body
pub struct StreamResponse {
    pub status: u16,
    pub body: Option<ByteStream>,
}

impl StreamResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// In-memory body, one stream item per chunk
    pub fn from_chunks<I, B>(status: u16, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, ApiError>> =
            chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
        Self::new(status, Box::pin(tokio_stream::iter(chunks)))
    }

    pub fn without_body(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body as text
    pub async fn text(self) -> Result<String, ApiError> {
        let Some(mut body) = self.body else {
            return Ok(String::new());
        };

        let mut decoder = Utf8Decoder::new();
        let mut text = String::new();
        while let Some(chunk) = body.next().await {
            text.push_str(&decoder.decode(&chunk?));
        }
        text.push_str(&decoder.finish());
        Ok(text)
    }
}

impl fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// Issues requests and hands back streaming responses
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: StreamRequest) -> Result<StreamResponse, ApiError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: StreamRequest) -> Result<StreamResponse, ApiError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ApiError::from));

        Ok(StreamResponse::new(status, Box::pin(body)))
    }
}
