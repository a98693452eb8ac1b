use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};
use widget_gateway::errors::read_body_bytes;
use widget_gateway::{CredentialSource, GatewayClient, HttpRequest, Transport, normalize_failure};

use crate::errors::PlaybackError;

/// Body of a speech synthesis request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SpeechRequest {
    #[serde(rename = "Text")]
    pub text: String,
    /// Voice/model name understood by the speech endpoint.
    #[serde(rename = "ModelName")]
    pub voice: String,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// Fetches one complete synthesized-audio payload.
///
/// Dropping the returned future must cancel the request.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes, PlaybackError>;
}

/// [`SpeechSynthesizer`] that posts to the gateway's speech endpoint.
#[derive(Clone)]
pub struct GatewaySpeech {
    url: String,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialSource>,
}

impl GatewaySpeech {
    /// Shares transport, credentials and endpoint configuration with `client`.
    pub fn new(client: &GatewayClient) -> Self {
        Self {
            url: client.config().speech_url(),
            transport: client.transport(),
            credentials: client.credentials(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for GatewaySpeech {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes, PlaybackError> {
        let body = serde_json::to_value(&request)
            .map_err(|e| PlaybackError::Transport(format!("failed to serialize request: {e}")))?;
        let http_request = HttpRequest::post_json(self.url.clone(), body)
            .bearer_token(self.credentials.bearer_token());
        debug!(url = %self.url, voice = %request.voice, chars = request.text.chars().count(), "requesting speech");

        let response = self
            .transport
            .send(http_request)
            .await
            .map_err(|e| PlaybackError::Transport(e.message))?;
        if !response.is_success() {
            let failure = normalize_failure(response).await;
            warn!(status = failure.status, error = %failure, "speech request failed");
            return Err(PlaybackError::Upstream(failure));
        }

        let audio = read_body_bytes(response.body)
            .await
            .map_err(|e| PlaybackError::Transport(e.message))?;
        if audio.is_empty() {
            return Err(PlaybackError::Decode("empty audio payload".into()));
        }
        debug!(bytes = audio.len(), "speech payload received");
        Ok(Bytes::from(audio))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use widget_gateway::{GatewayConfig, StaticToken, TransportError, TransportResponse};

    struct OneShotTransport {
        status: u16,
        chunks: Vec<&'static [u8]>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait::async_trait]
    impl Transport for OneShotTransport {
        async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
            let url = request.url.clone();
            self.seen.lock().expect("seen lock").push(request);
            let chunks = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect::<Vec<_>>();
            Ok(TransportResponse {
                status: self.status,
                status_text: String::new(),
                url,
                body: Box::pin(futures::stream::iter(chunks)),
            })
        }
    }

    fn speech(status: u16, chunks: Vec<&'static [u8]>) -> (GatewaySpeech, Arc<OneShotTransport>) {
        let transport = Arc::new(OneShotTransport {
            status,
            chunks,
            seen: Mutex::new(Vec::new()),
        });
        let client = GatewayClient::builder(GatewayConfig::new("http://gateway.test"))
            .transport(transport.clone())
            .credentials(Arc::new(StaticToken::new("tts-token")))
            .build()
            .expect("client");
        (GatewaySpeech::new(&client), transport)
    }

    #[tokio::test]
    async fn posts_text_and_model_name_and_collects_audio() {
        let (speech, transport) = speech(200, vec![b"RIFF", b"rest"]);
        let audio = speech
            .synthesize(SpeechRequest::new("hello", "alloy"))
            .await
            .expect("audio");
        assert_eq!(&audio[..], b"RIFFrest");

        let seen = transport.seen.lock().expect("seen lock");
        assert_eq!(seen[0].url, "http://gateway.test/v1/audio/speech");
        assert_eq!(seen[0].bearer_token.as_deref(), Some("tts-token"));
        assert_eq!(
            seen[0].body,
            Some(serde_json::json!({"Text": "hello", "ModelName": "alloy"}))
        );
    }

    #[tokio::test]
    async fn failure_status_is_normalized() {
        let (speech, _) = speech(429, vec![b"{\"error\":\"rate_limited\"}"]);
        let err = speech
            .synthesize(SpeechRequest::new("hello", "alloy"))
            .await
            .expect_err("should fail");
        match err {
            PlaybackError::Upstream(failure) => {
                assert_eq!(failure.status, 429);
                assert_eq!(failure.body["error"], "rate_limited");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_payload_is_a_decode_error() {
        let (speech, _) = speech(200, vec![]);
        let err = speech
            .synthesize(SpeechRequest::new("hello", "alloy"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, PlaybackError::Decode(_)));
    }
}
