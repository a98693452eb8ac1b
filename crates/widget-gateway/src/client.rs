use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{CredentialSource, GatewayConfig, NoCredentials, StaticToken};
use crate::errors::ConfigError;
use crate::session::StreamSession;
use crate::transport::{HttpRequest, HttpTransport, Transport};

pub(crate) struct ClientInner {
    pub(crate) config: GatewayConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Arc<dyn CredentialSource>,
}

/// Entry point for opening stream sessions against one gateway.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

impl GatewayClient {
    /// Starts a builder for `config`.
    pub fn builder(config: GatewayConfig) -> GatewayClientBuilder {
        GatewayClientBuilder {
            config,
            transport: None,
            credentials: None,
        }
    }

    /// Client with the reqwest transport and anonymous credentials.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// Builds a client from `WIDGET_*` environment variables.
    ///
    /// `WIDGET_API_TOKEN`, when set, is sent as a bearer token.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder(GatewayConfig::from_env()?);
        if let Some(token) = StaticToken::from_env() {
            builder = builder.credentials(Arc::new(token));
        }
        builder.build()
    }

    /// Opens an independent session. Sessions never share in-flight state.
    pub fn session(&self) -> StreamSession {
        StreamSession::new(self.inner.clone())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    pub fn credentials(&self) -> Arc<dyn CredentialSource> {
        self.inner.credentials.clone()
    }

    /// Checks that the gateway answers its health endpoint.
    ///
    /// Bounded by `health_timeout`; any failure reads as unavailable.
    pub async fn check_health(&self) -> bool {
        let config = &self.inner.config;
        let url = config.health_url();
        let request = HttpRequest::get(url.clone())
            .bearer_token(self.inner.credentials.bearer_token())
            .timeout(config.health_timeout);
        match tokio::time::timeout(config.health_timeout, self.inner.transport.send(request)).await
        {
            Ok(Ok(response)) if response.is_success() => {
                debug!(%url, status = response.status, "gateway health check succeeded");
                true
            }
            Ok(Ok(response)) => {
                warn!(%url, status = response.status, "gateway health check returned failure status");
                false
            }
            Ok(Err(err)) => {
                warn!(%url, error = %err, "gateway health check failed");
                false
            }
            Err(_) => {
                warn!(%url, timeout_ms = config.health_timeout.as_millis() as u64, "gateway health check timed out");
                false
            }
        }
    }
}

/// Builder for [`GatewayClient`].
pub struct GatewayClientBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Arc<dyn CredentialSource>>,
}

impl GatewayClientBuilder {
    /// Replaces the default reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Validates the base URL and builds the client.
    pub fn build(self) -> Result<GatewayClient, ConfigError> {
        let base_url = self.config.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "base_url",
                message: format!("expected an http(s) URL, got {base_url:?}"),
            });
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(NoCredentials));
        Ok(GatewayClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
                credentials,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{Scripted, ScriptedTransport};

    fn client(transport: Arc<ScriptedTransport>, timeout: Duration) -> GatewayClient {
        GatewayClient::builder(GatewayConfig::new("http://gateway.test").health_timeout(timeout))
            .transport(transport)
            .build()
            .expect("client")
    }

    #[test]
    fn build_rejects_non_http_base_url() {
        let result = GatewayClient::builder(GatewayConfig::new("gateway.test"))
            .transport(ScriptedTransport::new(vec![]))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "base_url", .. })
        ));
    }

    #[tokio::test]
    async fn health_check_reports_status() {
        let transport = ScriptedTransport::new(vec![
            Scripted::body(200, vec!["ok".to_string()]),
            Scripted::body(503, vec![]),
            Scripted::Refused("connection refused".into()),
        ]);
        let client = client(transport.clone(), Duration::from_secs(1));
        assert!(client.check_health().await);
        assert!(!client.check_health().await);
        assert!(!client.check_health().await);

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://gateway.test/health");
        assert_eq!(requests[0].timeout, Some(Duration::from_secs(1)));
        assert!(requests[0].bearer_token.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn health_check_is_bounded_by_timeout() {
        let transport = ScriptedTransport::new(vec![Scripted::Hang]);
        let client = client(transport, Duration::from_millis(250));
        assert!(!client.check_health().await);
    }

    #[tokio::test]
    #[ignore = "requires WIDGET_GATEWAY_URL pointing at a live gateway"]
    async fn live_gateway_is_healthy() {
        let _ = dotenvy::dotenv();
        let client = GatewayClient::from_env().expect("client from env");
        assert!(client.check_health().await);
    }
}
