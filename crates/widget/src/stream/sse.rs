//! Server-Sent Events frame decoding.

/// Splits a byte stream into SSE `data` payloads.
///
/// Network chunks may end anywhere, including inside a UTF-8 sequence; bytes
/// are buffered until a blank line closes the frame.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return the payloads of every frame they complete.
    ///
    /// Frames without `data` lines (keep-alive comments) yield nothing.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some((body_len, frame_len)) = frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..frame_len).collect();
            if let Some(data) = frame_data(frame.get(..body_len).unwrap_or_default()) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Whether an unterminated frame is buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }
}

/// Locate the first blank line, accepting `\n\n` and `\r\n\r\n`.
///
/// Returns the frame body length and the length including the terminator.
fn frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    buffer.iter().enumerate().find_map(|(i, byte)| {
        if *byte != b'\n' {
            return None;
        }
        match buffer.get(i + 1..) {
            Some([b'\n', ..]) => Some((i, i + 2)),
            Some([b'\r', b'\n', ..]) => Some((i, i + 3)),
            _ => None,
        }
    })
}

fn frame_data(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"ch").is_empty());
        assert!(decoder.has_partial());
        let payloads = decoder.push(b"unk\",\"chunk\":\"Hi\"}\n\ndata: {\"type\":\"end_turn\"}\n");
        assert_eq!(payloads, vec![r#"{"type":"chunk","chunk":"Hi"}"#.to_string()]);

        let payloads = decoder.push(b"\n");
        assert_eq!(payloads, vec![r#"{"type":"end_turn"}"#.to_string()]);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_multibyte_character_split() {
        let frame = "data: {\"chunk\":\"👋\"}\n\n".as_bytes();
        let (head, tail) = frame.split_at(18);
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec!["{\"chunk\":\"👋\"}".to_string()]);
    }

    #[test]
    fn test_crlf_frames() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"new_message\"}\r\n\r").is_empty());
        let payloads = decoder.push(b"\ndata: {\"type\":\"end_turn\"}\r\n\r\n");
        assert_eq!(
            payloads,
            vec![
                r#"{"type":"new_message"}"#.to_string(),
                r#"{"type":"end_turn"}"#.to_string()
            ]
        );
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_keep_alive_comments_are_skipped() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b":\n\ndata: {\"type\":\"new_message\"}\n\n");
        assert_eq!(payloads, vec![r#"{"type":"new_message"}"#.to_string()]);
    }
}
