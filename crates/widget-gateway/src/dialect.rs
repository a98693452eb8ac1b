//! Provider wire dialects and their frame normalizers.
//!
//! The dialect is resolved once per session from the provider tag; frames are
//! never re-inspected to guess their shape.

use crate::model::ProviderId;
use crate::stream::{CHUNK_OBJECT, ChatChunk, ChunkChoice, Delta, Usage};

/// Pure mapping from one decoded frame to zero or one normalized event.
pub type FrameNormalizer = fn(&serde_json::Value) -> Result<Option<ChatChunk>, FrameFailure>;

/// Why a frame could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameFailure {
    /// Frame reported an upstream error in-band.
    Upstream(String),
    /// Frame did not match the dialect's shape.
    Shape(String),
}

/// Upstream wire dialect.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Dialect {
    /// OpenAI-style `choices[].delta` chunks terminated by `[DONE]`.
    DeltaChunk,
    /// Ollama-style whole-message lines terminated by `done: true`.
    WholeMessage,
}

const DIALECTS: &[(&str, Dialect)] = &[
    ("openai", Dialect::DeltaChunk),
    ("azure", Dialect::DeltaChunk),
    ("groq", Dialect::DeltaChunk),
    ("mistral", Dialect::DeltaChunk),
    ("deepseek", Dialect::DeltaChunk),
    ("openrouter", Dialect::DeltaChunk),
    ("together", Dialect::DeltaChunk),
    ("anthropic", Dialect::DeltaChunk),
    ("gemini", Dialect::DeltaChunk),
    ("ollama", Dialect::WholeMessage),
    ("ollama-local", Dialect::WholeMessage),
];

impl Dialect {
    /// Looks up the dialect for `provider`; unknown tags speak delta-chunk.
    pub fn for_provider(provider: &ProviderId) -> Self {
        let tag = provider.as_str().trim();
        DIALECTS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, dialect)| *dialect)
            .unwrap_or(Dialect::DeltaChunk)
    }

    pub fn normalizer(self) -> FrameNormalizer {
        match self {
            Dialect::DeltaChunk => normalize_delta_chunk,
            Dialect::WholeMessage => normalize_whole_message,
        }
    }

    /// Whether a terminal event by itself completes the stream.
    ///
    /// Delta-chunk streams may still send a usage-only chunk after the
    /// finish reason and end on the sentinel instead.
    pub fn ends_on_terminal_event(self) -> bool {
        matches!(self, Dialect::WholeMessage)
    }
}

fn normalize_delta_chunk(value: &serde_json::Value) -> Result<Option<ChatChunk>, FrameFailure> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|v| v.as_str())
            .or_else(|| error.as_str())
            .unwrap_or("upstream stream error");
        return Err(FrameFailure::Upstream(message.to_string()));
    }
    serde_json::from_value::<ChatChunk>(value.clone())
        .map(Some)
        .map_err(|e| FrameFailure::Shape(format!("unexpected delta chunk shape: {e}")))
}

#[derive(serde::Deserialize)]
struct WholeMessageFrame {
    #[serde(default)]
    model: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    message: Option<WholeMessage>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    total_duration: Option<u64>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(serde::Deserialize)]
struct WholeMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

fn normalize_whole_message(value: &serde_json::Value) -> Result<Option<ChatChunk>, FrameFailure> {
    let frame: WholeMessageFrame = serde_json::from_value(value.clone())
        .map_err(|e| FrameFailure::Shape(format!("unexpected whole-message shape: {e}")))?;
    if let Some(error) = frame.error {
        return Err(FrameFailure::Upstream(error));
    }

    let (role, content) = match frame.message {
        Some(message) => (message.role, message.content),
        None => (None, frame.response),
    };
    let content = content.filter(|c| !c.is_empty());

    if !frame.done && content.is_none() && role.is_none() {
        return Ok(None);
    }

    let finish_reason = frame
        .done
        .then(|| frame.done_reason.clone().unwrap_or_else(|| "stop".to_string()));
    let has_counts = frame.total_duration.is_some()
        || frame.prompt_eval_count.is_some()
        || frame.eval_count.is_some();
    let usage = (frame.done && has_counts).then(|| {
        Usage::new(
            frame.prompt_eval_count.unwrap_or(0),
            frame.eval_count.unwrap_or(0),
        )
    });

    Ok(Some(ChatChunk {
        id: String::new(),
        object: CHUNK_OBJECT.to_string(),
        created: frame
            .created_at
            .as_deref()
            .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.timestamp())
            .unwrap_or(0),
        model: frame.model,
        choices: vec![ChunkChoice {
            index: 0,
            delta: Delta { role, content },
            finish_reason,
        }],
        usage,
    }))
}
