//! Normalized incremental events emitted by every chat stream, whatever the
//! upstream dialect.

pub(crate) const CHUNK_OBJECT: &str = "chat.completion.chunk";

fn chunk_object() -> String {
    CHUNK_OBJECT.to_string()
}

/// One incremental event in the delta-chunk shape.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default = "chunk_object")]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Token totals; missing upstream counts are 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl ChatChunk {
    /// Role announced by the first choice, if any.
    pub fn role(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.role.as_deref())
    }

    /// Delta text of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }

    /// Finish reason of the first choice that carries one.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.iter().find_map(|c| c.finish_reason.as_deref())
    }

    pub fn is_terminal(&self) -> bool {
        self.finish_reason().is_some()
    }
}

/// Aggregate of a fully drained stream.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatCompletion {
    pub role: Option<String>,
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    pub(crate) fn absorb(&mut self, chunk: &ChatChunk) {
        if self.role.is_none() {
            self.role = chunk.role().map(ToOwned::to_owned);
        }
        if let Some(text) = chunk.content() {
            self.content.push_str(text);
        }
        if let Some(reason) = chunk.finish_reason() {
            self.finish_reason = Some(reason.to_string());
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_deserialize_fills_defaults() {
        let chunk: ChatChunk =
            serde_json::from_value(serde_json::json!({"choices":[{"delta":{"content":"x"}}]}))
                .expect("deserialize");
        assert_eq!(chunk.object, CHUNK_OBJECT);
        assert_eq!(chunk.content(), Some("x"));
        assert!(!chunk.is_terminal());
    }

    #[test]
    fn completion_absorbs_content_reason_and_usage() {
        let mut completion = ChatCompletion::default();
        let mut first = ChatChunk::default();
        first.choices.push(ChunkChoice {
            index: 0,
            delta: Delta {
                role: Some("assistant".into()),
                content: Some("Hel".into()),
            },
            finish_reason: None,
        });
        let mut last = ChatChunk::default();
        last.choices.push(ChunkChoice {
            index: 0,
            delta: Delta {
                role: None,
                content: Some("lo".into()),
            },
            finish_reason: Some("stop".into()),
        });
        last.usage = Some(Usage::new(2, 3));
        completion.absorb(&first);
        completion.absorb(&last);
        assert_eq!(completion.content, "Hello");
        assert_eq!(completion.role.as_deref(), Some("assistant"));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.map(|u| u.total_tokens), Some(5));
    }
}
