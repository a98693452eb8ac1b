//! Line-level framing: stream markers, the completion sentinel and JSON decode.

/// Marker prefix carried by event-stream lines.
pub const DATA_PREFIX: &str = "data:";
/// Out-of-band completion marker.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Outcome of parsing one transport line.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Decoded JSON payload.
    Payload(serde_json::Value),
    /// Completion sentinel; the stream is finished.
    Done,
}

/// A line that could not be decoded as JSON.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frame JSON ({error}): {line}")]
pub struct FrameError {
    pub line: String,
    pub error: String,
}

/// Parses one line. Blank lines, comments and non-data event-stream fields
/// yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Frame>, FrameError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    if ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
    {
        return Ok(None);
    }
    let payload = match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.trim(),
        None => line,
    };
    if payload.is_empty() {
        return Ok(None);
    }
    if payload == DONE_SENTINEL {
        return Ok(Some(Frame::Done));
    }
    serde_json::from_str(payload)
        .map(|value| Some(Frame::Payload(value)))
        .map_err(|e| FrameError {
            line: truncate(payload, 200),
            error: e.to_string(),
        })
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_prefix_and_parses_json() {
        let frame = parse_line("data: {\"a\":1}").expect("parse");
        assert_eq!(frame, Some(Frame::Payload(serde_json::json!({"a":1}))));
        let bare = parse_line("  {\"done\":false}  ").expect("parse");
        assert_eq!(bare, Some(Frame::Payload(serde_json::json!({"done":false}))));
    }

    #[test]
    fn sentinel_signals_done_with_or_without_prefix() {
        assert_eq!(parse_line("data: [DONE]").expect("parse"), Some(Frame::Done));
        assert_eq!(parse_line("data:[DONE]").expect("parse"), Some(Frame::Done));
        assert_eq!(parse_line("[DONE]").expect("parse"), Some(Frame::Done));
    }

    #[test]
    fn skips_blank_comment_and_event_lines() {
        for line in ["", "   ", ": keep-alive", "event: message", "id: 7", "retry: 100", "data:"] {
            assert_eq!(parse_line(line).expect("parse"), None, "line {line:?}");
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = parse_line("data: {\"choices\": [").expect_err("should fail");
        assert_eq!(err.line, "{\"choices\": [");
        assert!(!err.error.is_empty());
    }
}
