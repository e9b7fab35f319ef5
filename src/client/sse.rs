//! Incremental decoder for `text/event-stream` bodies.
//!
//! Handles only what the relay emits: `data:` lines and `:` comments,
//! with events separated by a blank line. `event:`, `id:` and `retry:`
//! fields are ignored.

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A data event; multiple `data:` lines are joined with `\n`.
    Data(String),
    /// A comment line, such as a heartbeat.
    Comment(String),
}

/// Accumulates body chunks and yields complete frames.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one body chunk and returns every frame it completes.
    ///
    /// Chunks may split lines (and multi-byte characters) anywhere.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    frames.push(SseFrame::Data(self.data.join("\n")));
                    self.data.clear();
                }
            } else if let Some(comment) = line.strip_prefix(':') {
                frames.push(SseFrame::Comment(comment.trim_start().to_string()));
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data
                    .push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_and_heartbeat() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"bat\":1}\n\n:heartbeat\n\n");
        assert_eq!(
            frames,
            vec![
                SseFrame::Data("{\"bat\":1}".to_string()),
                SseFrame::Comment("heartbeat".to_string()),
            ]
        );
    }

    #[test]
    fn handles_split_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"da").is_empty());
        assert!(decoder.push(b"ta: {\"thr\":").is_empty());
        assert!(decoder.push(b"50}\r\n").is_empty());
        assert_eq!(
            decoder.push(b"\r\n"),
            vec![SseFrame::Data("{\"thr\":50}".to_string())]
        );
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: \u{00b0}C\n\n".as_bytes();
        let (head, tail) = bytes.split_at(7);
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec![SseFrame::Data("\u{00b0}C".to_string())]);
    }

    #[test]
    fn joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: a\ndata: b\n\n");
        assert_eq!(frames, vec![SseFrame::Data("a\nb".to_string())]);
    }

    #[test]
    fn ignores_unknown_fields() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: telemetry\nid: 4\ndata: x\n\n");
        assert_eq!(frames, vec![SseFrame::Data("x".to_string())]);
    }
}
