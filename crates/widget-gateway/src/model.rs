use std::fmt;

/// Stable identifier for an upstream provider dialect (for example `openai`
/// or `ollama`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Creates a provider id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the provider id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Gateway endpoint a stream request targets.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    #[default]
    Chat,
    Generate,
}

/// Sampling options forwarded verbatim to the gateway.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecodingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Normalizes a caller-supplied model id for `provider`.
///
/// Leading `<provider>/` and `models/` namespaces are stripped repeatedly;
/// an id that ends up empty becomes `fallback`.
pub fn normalize_model_id(provider: &ProviderId, raw: &str, fallback: &str) -> String {
    let provider_prefix = format!("{}/", provider.as_str().to_ascii_lowercase());
    let mut model = raw.trim();
    loop {
        let lower = model.to_ascii_lowercase();
        if provider_prefix != "/" && lower.starts_with(&provider_prefix) {
            model = model[provider_prefix.len()..].trim_start();
        } else if lower.starts_with("models/") {
            model = model["models/".len()..].trim_start();
        } else {
            break;
        }
    }
    if model.is_empty() {
        fallback.to_string()
    } else {
        model.to_string()
    }
}
