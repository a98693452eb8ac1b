/// One chat message sent to the gateway.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<MessageContent>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new("system", MessageContent::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", MessageContent::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new("assistant", MessageContent::Text(text.into()))
    }

    /// Concatenated text of the message, ignoring image parts.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Message content: plain text or a list of structured parts.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(value: Vec<ContentPart>) -> Self {
        Self::Parts(value)
    }
}

/// Structured content entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Image part; `url` may be an http(s) URL, a data URI or bare base64.
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: ImageDetail::Auto,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default)]
    pub detail: ImageDetail,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    Auto,
    Low,
    High,
}

/// Upgrades a bare base64 image payload to a data URI.
///
/// URLs and existing data URIs are returned unchanged.
pub fn to_image_data_uri(image: &str) -> String {
    let trimmed = image.trim();
    if trimmed.starts_with("data:")
        || trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
    {
        return trimmed.to_string();
    }
    format!("data:{};base64,{trimmed}", sniff_base64_mime(trimmed))
}

fn sniff_base64_mime(payload: &str) -> &'static str {
    if payload.starts_with("/9j/") {
        "image/jpeg"
    } else if payload.starts_with("R0lGOD") {
        "image/gif"
    } else if payload.starts_with("UklGR") {
        "image/webp"
    } else {
        "image/png"
    }
}

/// Rewrites every image part of `messages` so bare base64 becomes a data URI.
pub(crate) fn upgrade_message_images(messages: &mut [ChatMessage]) {
    for message in messages {
        if let MessageContent::Parts(parts) = &mut message.content {
            for part in parts {
                if let ContentPart::ImageUrl { image_url } = part {
                    image_url.url = to_image_data_uri(&image_url.url);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_serialize_with_type_tags() {
        let message = ChatMessage::new(
            "user",
            vec![
                ContentPart::text("what is this?"),
                ContentPart::image("https://example.com/cat.png"),
            ],
        );
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "what is this?"},
                    {"type": "image_url", "image_url": {"url": "https://example.com/cat.png", "detail": "auto"}}
                ]
            })
        );
    }

    #[test]
    fn plain_text_content_serializes_as_string() {
        let value = serde_json::to_value(ChatMessage::user("hi")).expect("serialize");
        assert_eq!(value, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn bare_base64_is_upgraded_with_sniffed_mime() {
        assert_eq!(to_image_data_uri("iVBORw0KGgo="), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(to_image_data_uri("/9j/4AAQ"), "data:image/jpeg;base64,/9j/4AAQ");
        assert_eq!(
            to_image_data_uri("data:image/gif;base64,R0lGOD"),
            "data:image/gif;base64,R0lGOD"
        );
        assert_eq!(to_image_data_uri("https://x.test/a.png"), "https://x.test/a.png");
    }

    #[test]
    fn message_images_are_upgraded_in_place() {
        let mut messages = vec![ChatMessage::new(
            "user",
            vec![ContentPart::text("look"), ContentPart::image("UklGRabc")],
        )];
        upgrade_message_images(&mut messages);
        let MessageContent::Parts(parts) = &messages[0].content else {
            panic!("expected parts");
        };
        assert!(matches!(
            &parts[1],
            ContentPart::ImageUrl { image_url } if image_url.url == "data:image/webp;base64,UklGRabc"
        ));
        assert_eq!(messages[0].text(), "look");
    }
}
