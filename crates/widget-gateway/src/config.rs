use std::time::Duration;

use crate::errors::ConfigError;
use crate::model::EndpointKind;

/// Model id used when a request carries none.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Static endpoint configuration shared by every session of a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the gateway, without a trailing path.
    pub base_url: String,
    pub chat_path: String,
    pub generate_path: String,
    pub speech_path: String,
    pub health_path: String,
    /// Fallback model id for requests with an empty model.
    pub default_model: String,
    /// Upper bound for the startup availability check.
    pub health_timeout: Duration,
}

impl GatewayConfig {
    /// Creates a config with default paths for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            chat_path: "/v1/chat/completions".to_string(),
            generate_path: "/v1/completions".to_string(),
            speech_path: "/v1/audio/speech".to_string(),
            health_path: "/health".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            health_timeout: Duration::from_secs(3),
        }
    }

    /// Builds a config from the environment.
    ///
    /// - `WIDGET_GATEWAY_URL` (required)
    /// - `WIDGET_DEFAULT_MODEL`
    /// - `WIDGET_HEALTH_TIMEOUT_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("WIDGET_GATEWAY_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ConfigError::MissingEnv("WIDGET_GATEWAY_URL"));
        }
        let mut config = Self::new(base_url.trim());
        if let Ok(model) = std::env::var("WIDGET_DEFAULT_MODEL")
            && !model.trim().is_empty()
        {
            config.default_model = model.trim().to_string();
        }
        if let Ok(raw) = std::env::var("WIDGET_HEALTH_TIMEOUT_MS") {
            let millis = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: "WIDGET_HEALTH_TIMEOUT_MS",
                message: e.to_string(),
            })?;
            config.health_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    pub fn generate_path(mut self, path: impl Into<String>) -> Self {
        self.generate_path = path.into();
        self
    }

    pub fn speech_path(mut self, path: impl Into<String>) -> Self {
        self.speech_path = path.into();
        self
    }

    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    pub fn endpoint_url(&self, kind: EndpointKind) -> String {
        match kind {
            EndpointKind::Chat => self.join(&self.chat_path),
            EndpointKind::Generate => self.join(&self.generate_path),
        }
    }

    pub fn speech_url(&self) -> String {
        self.join(&self.speech_path)
    }

    pub fn health_url(&self) -> String {
        self.join(&self.health_path)
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Supplies the bearer token for outbound requests.
pub trait CredentialSource: Send + Sync {
    /// Current token, or `None` for anonymous requests.
    fn bearer_token(&self) -> Option<String>;
}

/// Anonymous access.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Fixed bearer token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Reads `WIDGET_API_TOKEN`; `None` when unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var("WIDGET_API_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Self)
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

impl CredentialSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slashes() {
        let config = GatewayConfig::new("https://gw.example.com/");
        assert_eq!(
            config.endpoint_url(EndpointKind::Chat),
            "https://gw.example.com/v1/chat/completions"
        );
        assert_eq!(
            config.clone().generate_path("api/generate").endpoint_url(EndpointKind::Generate),
            "https://gw.example.com/api/generate"
        );
        assert_eq!(config.speech_url(), "https://gw.example.com/v1/audio/speech");
        assert_eq!(config.health_url(), "https://gw.example.com/health");
    }

    #[test]
    fn defaults_are_applied() {
        let config = GatewayConfig::new("http://localhost:8080");
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.health_timeout, Duration::from_secs(3));
    }

    #[test]
    fn static_token_is_redacted_in_debug() {
        let token = StaticToken::new("secret");
        assert_eq!(token.bearer_token().as_deref(), Some("secret"));
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(NoCredentials.bearer_token(), None);
    }
}
