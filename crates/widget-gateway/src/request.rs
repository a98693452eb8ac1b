use crate::content::{ChatMessage, to_image_data_uri, upgrade_message_images};
use crate::errors::StreamError;
use crate::model::{DecodingOptions, EndpointKind, ProviderId, normalize_model_id};

/// One streaming completion request.
///
/// Built with the chained setters and handed to
/// [`StreamSession::start`](crate::session::StreamSession::start).
#[derive(Clone, Debug, PartialEq)]
pub struct StreamRequest {
    pub endpoint: EndpointKind,
    pub provider: ProviderId,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: DecodingOptions,
    /// Images attached at request level (URLs, data URIs or bare base64).
    pub images: Vec<String>,
}

impl StreamRequest {
    pub fn new(
        endpoint: EndpointKind,
        provider: impl Into<ProviderId>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            provider: provider.into(),
            model: model.into(),
            messages: Vec::new(),
            options: DecodingOptions::default(),
            images: Vec::new(),
        }
    }

    pub fn chat(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self::new(EndpointKind::Chat, provider, model)
    }

    pub fn generate(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self::new(EndpointKind::Generate, provider, model)
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.options.top_p = Some(top_p);
        self
    }

    pub fn stop(mut self, stop: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.images.push(image.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StreamError> {
        if self.provider.as_str().trim().is_empty() {
            return Err(StreamError::Validation("provider must not be empty".into()));
        }
        if self.messages.is_empty() {
            return Err(StreamError::Validation(
                "at least one message is required".into(),
            ));
        }
        if let Some(message) = self.messages.iter().find(|m| m.role.trim().is_empty()) {
            return Err(StreamError::Validation(format!(
                "message role must not be empty (content: {:?})",
                message.text()
            )));
        }
        Ok(())
    }
}

/// JSON body posted to the gateway.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OutboundBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(flatten)]
    pub options: DecodingOptions,
    pub provider: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Builds the outbound body: model normalized, images upgraded to data URIs.
pub fn build_request_body(request: &StreamRequest, default_model: &str) -> OutboundBody {
    let mut messages = request.messages.clone();
    upgrade_message_images(&mut messages);
    OutboundBody {
        model: normalize_model_id(&request.provider, &request.model, default_model),
        messages,
        stream: true,
        options: request.options.clone(),
        provider: request.provider.to_string(),
        images: request
            .images
            .iter()
            .map(|image| to_image_data_uri(image))
            .collect(),
    }
}
