/// Splits a chunked byte stream into complete lines.
///
/// Bytes are buffered and only cut at `\n`, which never occurs inside a
/// multi-byte UTF-8 sequence, so characters split across chunks survive.
#[derive(Debug, Default)]
pub struct LineReader {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no `\n`.
    scanned: usize,
}

impl LineReader {
    /// Appends `chunk` and returns every line it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();
        lines
    }

    /// Flushes the carry-over at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let line = decode_line(&rest);
        if line.trim().is_empty() { None } else { Some(line) }
    }

    /// Number of bytes waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multibyte_character_split_across_chunks_decodes() {
        let mut reader = LineReader::default();
        let text = "{\"content\":\"caf\u{e9} \u{1f600}\"}\n";
        let bytes = text.as_bytes();
        let e_acute = text.find('\u{e9}').expect("char present");
        let first = reader.push_chunk(&bytes[..e_acute + 1]);
        assert!(first.is_empty());
        let emoji = text.find('\u{1f600}').expect("emoji present");
        assert!(reader.push_chunk(&bytes[e_acute + 1..emoji + 2]).is_empty());
        let lines = reader.push_chunk(&bytes[emoji + 2..]);
        assert_eq!(lines, vec!["{\"content\":\"caf\u{e9} \u{1f600}\"}".to_string()]);
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn several_lines_in_one_chunk_and_crlf() {
        let mut reader = LineReader::default();
        let lines = reader.push_chunk(b"data: a\r\n\r\ndata: b\npartial");
        assert_eq!(lines, vec!["data: a", "", "data: b"]);
        assert_eq!(reader.pending_len(), "partial".len());
    }

    #[test]
    fn finish_returns_unterminated_carry_over() {
        let mut reader = LineReader::default();
        assert!(reader.push_chunk(b"{\"done\":true}").is_empty());
        assert_eq!(reader.finish().as_deref(), Some("{\"done\":true}"));
        assert_eq!(reader.finish(), None);
    }

    #[test]
    fn long_unterminated_line_is_scanned_once_per_byte() {
        let mut reader = LineReader::default();
        for _ in 0..1_000 {
            assert!(reader.push_chunk(b"abcdefgh").is_empty());
            assert_eq!(reader.scanned, reader.pending_len());
        }
        let lines = reader.push_chunk(b"!\nnext");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 8_001);
        assert!(lines[0].ends_with("gh!"));
        assert_eq!(reader.pending_len(), "next".len());
        assert_eq!(reader.scanned, "next".len());
        assert_eq!(reader.push_chunk(b"\r\n"), vec!["next"]);
        assert_eq!((reader.pending_len(), reader.scanned), (0, 0));
    }

    #[test]
    fn finish_ignores_whitespace_only_carry_over() {
        let mut reader = LineReader::default();
        reader.push_chunk(b"x\n  ");
        assert_eq!(reader.finish(), None);
    }
}
