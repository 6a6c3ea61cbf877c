//! Incremental decoder for the `text/event-stream` wire format.
//!
//! The transport delivers arbitrary byte chunks; events are terminated by a
//! blank line. Only `data:` fields matter here: the backend sends one JSON
//! log record per event and never sets `event:` or `id:`. Comment lines
//! (leading `:`) are keep-alives and are skipped.

/// Stateful decoder: feed it chunks, get back complete `data` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        SseDecoder::default()
    }

    /// Append a chunk and drain any events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
        // Normalize CRLF so the blank-line scan below only deals with \n\n.
        // A trailing lone \r waits for the \n in the next chunk.
        if self.buf.contains('\r') {
            self.buf = self.buf.replace("\r\n", "\n");
        }

        let mut payloads = Vec::new();
        while let Some(boundary) = self.buf.find("\n\n") {
            let event: String = self.buf.drain(..boundary + 2).collect();
            if let Some(data) = parse_event(&event) {
                payloads.push(data);
            }
        }
        payloads
    }
}

/// Extract the concatenated `data` payload from one raw event block.
/// Returns None for events with no data (comments / keep-alives).
fn parse_event(event: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    for line in event.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // event:/id:/retry: fields are ignored; the backend never sends them
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b"data: {\"id\": 1}\n\n");
        assert_eq!(out, vec![r#"{"id": 1}"#]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: {\"id\"").is_empty());
        assert!(dec.feed(b": 1}").is_empty());
        let out = dec.feed(b"\n\ndata: {\"id\": 2}\n\n");
        assert_eq!(out, vec![r#"{"id": 1}"#, r#"{"id": 2}"#]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b"data: a\n\ndata: b\n\ndata: c\n\n");
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b"data: x\r\n\r\n");
        assert_eq!(out, vec!["x"]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: x\r\n\r").is_empty());
        let out = dec.feed(b"\n");
        assert_eq!(out, vec!["x"]);
    }

    #[test]
    fn test_comment_keepalive_skipped() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b": keep-alive\n\ndata: real\n\n");
        assert_eq!(out, vec!["real"]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(out, vec!["line1\nline2"]);
    }

    #[test]
    fn test_event_field_ignored() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b"event: stats\ndata: payload\n\n");
        assert_eq!(out, vec!["payload"]);
    }

    #[test]
    fn test_data_without_space() {
        let mut dec = SseDecoder::new();
        let out = dec.feed(b"data:tight\n\n");
        assert_eq!(out, vec!["tight"]);
    }
}
