use futures::StreamExt as _;
use tracing::warn;

use crate::model::ProviderId;
use crate::transport::{ByteStream, TransportResponse};

/// Structured failure for a non-success upstream exchange.
///
/// Built by [`normalize_failure`]; callers never see a bare status code.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("upstream request to {url} failed with status {status}: {}", self.message())]
pub struct GatewayError {
    /// HTTP status code returned by the gateway.
    pub status: u16,
    /// Canonical reason phrase for `status` (may be empty).
    pub status_text: String,
    /// Parsed JSON body, or `{"message": <raw text>}` when the body was not JSON.
    pub body: serde_json::Value,
    /// Request URL that produced the failure.
    pub url: String,
}

impl GatewayError {
    /// Best human-readable message carried by the body.
    pub fn message(&self) -> String {
        let body = &self.body;
        body.get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .or_else(|| body.get("error").and_then(|v| v.as_str()))
            .or_else(|| body.get("message").and_then(|v| v.as_str()))
            .or_else(|| body.get("detail").and_then(|v| v.as_str()))
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| {
                if self.status_text.is_empty() {
                    format!("status {}", self.status)
                } else {
                    self.status_text.clone()
                }
            })
    }
}

/// Failure while reading bytes from an open transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal failure of a chat stream session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// Gateway answered with a non-success status.
    #[error(transparent)]
    Upstream(GatewayError),
    /// Network unreachable or stream read failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
    /// A frame failed to parse or violated the expected shape.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },
    /// The request was rejected before any I/O happened.
    #[error("validation error: {0}")]
    Validation(String),
}

impl StreamError {
    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn protocol(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// HTTP status for upstream failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Missing or invalid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Reads a response body to the end and lossily decodes it as UTF-8.
pub async fn read_body_text(body: ByteStream) -> Result<String, TransportError> {
    let bytes = read_body_bytes(body).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads a response body to the end.
pub async fn read_body_bytes(mut body: ByteStream) -> Result<Vec<u8>, TransportError> {
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

/// Converts a failed exchange into one [`GatewayError`].
///
/// An unreadable body becomes `"status N"`; a body that is not JSON is kept
/// under a `message` field.
pub async fn normalize_failure(response: TransportResponse) -> GatewayError {
    let TransportResponse {
        status,
        status_text,
        url,
        body,
    } = response;
    let text = match read_body_text(body).await {
        Ok(text) => text,
        Err(err) => {
            warn!(status, url = %url, error = %err, "failed to read error body");
            format!("status {status}")
        }
    };
    let body = serde_json::from_str::<serde_json::Value>(&text)
        .unwrap_or_else(|_| serde_json::json!({ "message": text }));
    GatewayError {
        status,
        status_text,
        body,
        url,
    }
}
