//! Incremental decoder for newline-delimited `data: ` records
//!
//! Bytes arrive in chunks with no alignment to record boundaries. The
//! decoder keeps the unterminated tail of the last chunk and only decodes
//! lines that are complete. Buffering is byte-level, so a multi-byte UTF-8
//! sequence split across chunks is reassembled before decoding.

use crate::error::{Error, Result};
use crate::stream::StreamEvent;

/// Marker every record of interest starts with
pub const RECORD_PREFIX: &str = "data: ";

/// Per-stream decode state
#[derive(Debug, Default)]
pub struct RecordDecoder {
    buffer: Vec<u8>,
}

impl RecordDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk. Returns the events of every record completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            push_record(&line[..pos], &mut events);
        }
        events
    }

    /// Flush at end of stream. An unterminated tail is decoded as a final record.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        if !rest.is_empty() {
            push_record(&rest, &mut events);
        }
        events
    }

    /// Number of bytes waiting for a newline
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn push_record(line: &[u8], events: &mut Vec<StreamEvent>) {
    let text = String::from_utf8_lossy(line);
    match decode_record(&text) {
        Ok(Some(event)) => events.push(event),
        Ok(None) => {}
        Err(e) => tracing::warn!("Skipping stream record: {}", e),
    }
}

/// Decode one complete line.
///
/// Returns `Ok(None)` for blank lines and lines without the record marker.
/// A JSON object with an unrecognized `type` decodes to
/// [`StreamEvent::Unknown`].
pub fn decode_record(line: &str) -> Result<Option<StreamEvent>> {
    let line = line.trim();
    let Some(payload) = line.strip_prefix(RECORD_PREFIX) else {
        return Ok(None);
    };

    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| Error::Decode(format!("invalid JSON: {e}")))?;

    let kind = value.get("type").and_then(|t| t.as_str()).map(str::to_owned);

    match kind.as_deref() {
        Some(kind) if StreamEvent::KNOWN_KINDS.contains(&kind) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::Decode(format!("malformed {kind} record: {e}"))),
        _ if value.is_object() => Ok(Some(StreamEvent::Unknown {
            raw: payload.to_string(),
        })),
        _ => Err(Error::Decode("record is not a JSON object".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "data: {\"type\":\"status\",\"message\":\"Searching your recipe database...\"}\n\n",
        "data: {\"type\":\"tool_use\",\"message\":\"Looking up pantry\"}\n\n",
        "data: {\"type\":\"response\",\"content\":\"Try shakshuka\",\"thread_id\":\"thread_abc\"}\n\n",
        "data: {\"type\":\"end\"}\n\n",
    );

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = RecordDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.feed(chunk));
        }
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn test_decode_status_record() {
        let ev = decode_record("data: {\"type\":\"status\",\"message\":\"hi\"}")
            .unwrap()
            .unwrap();
        assert_eq!(
            ev,
            StreamEvent::Status {
                message: "hi".into()
            }
        );
    }

    #[test]
    fn test_decode_response_record() {
        let ev = decode_record(
            "data: {\"type\":\"response\",\"content\":\"Soup\",\"thread_id\":\"t_1\"}",
        )
        .unwrap()
        .unwrap();
        assert_eq!(ev.conversation_id(), Some("t_1"));
    }

    #[test]
    fn test_decode_server_error_record() {
        let ev = decode_record("data: {\"type\":\"error\",\"message\":\"model down\"}")
            .unwrap()
            .unwrap();
        assert_eq!(ev, StreamEvent::error("model down"));
    }

    #[test]
    fn test_blank_and_unmarked_lines_are_skipped() {
        assert_eq!(decode_record("").unwrap(), None);
        assert_eq!(decode_record("   ").unwrap(), None);
        assert_eq!(decode_record(": keep-alive").unwrap(), None);
        assert_eq!(decode_record("event: status").unwrap(), None);
    }

    #[test]
    fn test_unknown_tag_is_kept() {
        let ev = decode_record("data: {\"type\":\"thinking\",\"message\":\"hmm\"}")
            .unwrap()
            .unwrap();
        match ev {
            StreamEvent::Unknown { raw } => assert!(raw.contains("thinking")),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = decode_record("data: {not json}").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_known_tag_missing_fields_is_decode_error() {
        let err = decode_record("data: {\"type\":\"response\",\"content\":\"x\"}").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_whole_stream_in_one_chunk() {
        let events = decode_all(&[SAMPLE.as_bytes()]);
        let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["status", "tool_use", "response", "end"]);
    }

    #[test]
    fn test_split_mid_json_matches_single_chunk() {
        let bytes = SAMPLE.as_bytes();
        let whole = decode_all(&[bytes]);

        let cut = SAMPLE.find("shakshuka").unwrap();
        let (first, second) = bytes.split_at(cut);
        assert_eq!(decode_all(&[first, second]), whole);
    }

    #[test]
    fn test_every_split_point_matches_single_chunk() {
        let bytes = SAMPLE.as_bytes();
        let whole = decode_all(&[bytes]);
        for cut in 0..=bytes.len() {
            let (first, second) = bytes.split_at(cut);
            assert_eq!(decode_all(&[first, second]), whole, "split at {cut}");
        }
    }

    #[test]
    fn test_partial_record_stays_buffered() {
        let mut decoder = RecordDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"status\",\"mess");
        assert!(events.is_empty());
        assert!(decoder.buffered_len() > 0);

        let events = decoder.feed(b"age\":\"ok\"}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let record = "data: {\"type\":\"status\",\"message\":\"Crème brûlée\"}\n";
        let bytes = record.as_bytes();
        let cut = record.find("è").unwrap() + 1;
        let events = decode_all(&[&bytes[..cut], &bytes[cut..]]);
        assert_eq!(
            events,
            vec![StreamEvent::Status {
                message: "Crème brûlée".into()
            }]
        );
    }

    #[test]
    fn test_malformed_record_between_good_ones() {
        let stream = concat!(
            "data: {\"type\":\"status\",\"message\":\"one\"}\n",
            "data: {\"type\":\"status\",\"message\":\n",
            "data: {\"type\":\"end\"}\n",
        );
        let events = decode_all(&[stream.as_bytes()]);
        assert_eq!(
            events,
            vec![
                StreamEvent::Status {
                    message: "one".into()
                },
                StreamEvent::End
            ]
        );
    }

    #[test]
    fn test_unterminated_final_record_is_decoded() {
        let events = decode_all(&[b"data: {\"type\":\"status\",\"message\":\"a\"}\ndata: {\"type\":\"end\"}".as_slice()]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], StreamEvent::End);
    }

    #[test]
    fn test_crlf_line_endings() {
        let events = decode_all(&[b"data: {\"type\":\"end\"}\r\n\r\n".as_slice()]);
        assert_eq!(events, vec![StreamEvent::End]);
    }
}
