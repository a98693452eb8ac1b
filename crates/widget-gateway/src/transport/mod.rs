//! HTTP transport seam and the byte-to-line reader used by stream sessions.
//!
//! `Transport` is the only place the crate touches the network, so tests can
//! script responses chunk by chunk.
mod http;
mod reader;

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;

use crate::errors::TransportError;

pub use http::HttpTransport;
pub use reader::LineReader;

/// Response body as a stream of raw chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<Bytes, TransportError>> + Send + 'static>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Outbound request handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub bearer_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
            bearer_token: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            bearer_token: None,
            timeout: None,
        }
    }

    pub fn bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response head plus an unread body.
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub url: String,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Sends one request and returns the response head with a streaming body.
///
/// Implementations must not read the body eagerly; a non-success status is
/// returned as a normal response so the caller can normalize it.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError>;
}
