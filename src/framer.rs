//! Streaming message framer.
//!
//! Splits a raw byte stream into discrete messages on a configurable
//! delimiter. Uses `bytes::BytesMut` to carry the unterminated tail of the
//! last chunk (the remainder) across calls, so a message or even the
//! delimiter itself may be split arbitrarily across socket reads.
//!
//! The wire format has no escaping: a payload containing the delimiter is
//! silently split into multiple messages. That is a documented constraint
//! of the format, not an error; the framer cannot fail on arbitrary bytes.
//!
//! # Example
//!
//! ```
//! use socket_serial::framer::MessageFramer;
//!
//! let mut framer = MessageFramer::new(";");
//! assert_eq!(framer.push(b"hello;wor"), vec!["hello".to_string()]);
//! assert_eq!(framer.push(b"ld;"), vec!["world".to_string()]);
//! assert!(framer.remainder().is_empty());
//! ```

use bytes::BytesMut;

/// Splits a delimiter-terminated byte stream into complete messages.
///
/// Invariant: after every [`push`](Self::push), the internal remainder never
/// contains a complete delimiter occurrence.
#[derive(Debug)]
pub struct MessageFramer {
    /// Unterminated tail carried over from the previous push.
    remainder: BytesMut,
    /// Delimiter as raw bytes; never empty.
    delimiter: Vec<u8>,
}

impl MessageFramer {
    /// Create a framer for the given delimiter.
    ///
    /// # Panics
    ///
    /// Panics if `delimiter` is empty; framing is meaningless without one.
    pub fn new(delimiter: &str) -> Self {
        assert!(!delimiter.is_empty(), "delimiter must be non-empty");
        Self {
            remainder: BytesMut::new(),
            delimiter: delimiter.as_bytes().to_vec(),
        }
    }

    /// Feed a chunk of stream bytes and extract every complete message.
    ///
    /// Scans greedily: the text before each delimiter occurrence becomes one
    /// message, the delimiter is consumed, and the scan repeats until no
    /// delimiter remains. Zero-length messages (adjacent delimiters,
    /// including bare heartbeat frames) are recognized but discarded. The
    /// unterminated tail is retained for the next push.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.remainder.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = find_delimiter(&self.remainder, &self.delimiter) {
            let raw = self.remainder.split_to(pos + self.delimiter.len());
            let body = &raw[..pos];
            if !body.is_empty() {
                messages.push(String::from_utf8_lossy(body).into_owned());
            }
        }

        messages
    }

    /// The unterminated tail currently carried over.
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    /// Drop any carried-over tail.
    pub fn clear(&mut self) {
        self.remainder.clear();
    }
}

/// First occurrence of `delimiter` within `haystack`.
fn find_delimiter(haystack: &[u8], delimiter: &[u8]) -> Option<usize> {
    if haystack.len() < delimiter.len() {
        return None;
    }
    haystack
        .windows(delimiter.len())
        .position(|window| window == delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_message() {
        let mut framer = MessageFramer::new(";");
        assert_eq!(framer.push(b"hello;"), vec!["hello".to_string()]);
        assert!(framer.remainder().is_empty());
    }

    #[test]
    fn test_multiple_messages_one_chunk() {
        let mut framer = MessageFramer::new(";");
        assert_eq!(
            framer.push(b"a;b;c;"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(framer.remainder().is_empty());
    }

    #[test]
    fn test_unterminated_tail_is_carried() {
        let mut framer = MessageFramer::new(";");
        assert_eq!(framer.push(b"hello;wor"), vec!["hello".to_string()]);
        assert_eq!(framer.remainder(), b"wor");
        assert_eq!(framer.push(b"ld;"), vec!["world".to_string()]);
        assert!(framer.remainder().is_empty());
    }

    #[test]
    fn test_empty_messages_are_discarded() {
        let mut framer = MessageFramer::new(";");
        assert_eq!(
            framer.push(b"hello;;world;"),
            vec!["hello".to_string(), "world".to_string()]
        );
    }

    #[test]
    fn test_bare_heartbeat_frame_produces_nothing() {
        let mut framer = MessageFramer::new(";");
        assert!(framer.push(b";").is_empty());
        assert!(framer.push(b";;;").is_empty());
        assert!(framer.remainder().is_empty());
    }

    #[test]
    fn test_split_delimiter_boundary_scenario() {
        let mut framer = MessageFramer::new(";");
        let mut messages = framer.push(b"hello;wor");
        messages.extend(framer.push(b"ld;;foo;"));
        assert_eq!(
            messages,
            vec!["hello".to_string(), "world".to_string(), "foo".to_string()]
        );
        assert!(framer.remainder().is_empty());
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let stream = b"alpha;beta;;gamma;delta";
        let whole = {
            let mut framer = MessageFramer::new(";");
            framer.push(stream)
        };

        // Every possible two-way split must produce the same output.
        for split in 0..=stream.len() {
            let mut framer = MessageFramer::new(";");
            let mut messages = framer.push(&stream[..split]);
            messages.extend(framer.push(&stream[split..]));
            assert_eq!(messages, whole, "split at {}", split);
            assert_eq!(framer.remainder(), b"delta");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut framer = MessageFramer::new(";");
        let mut messages = Vec::new();
        for byte in b"first;second;" {
            messages.extend(framer.push(&[*byte]));
        }
        assert_eq!(messages, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_multibyte_delimiter() {
        let mut framer = MessageFramer::new("\r\n");
        assert_eq!(
            framer.push(b"one\r\ntwo\r\nthr"),
            vec!["one".to_string(), "two".to_string()]
        );
        assert_eq!(framer.remainder(), b"thr");
    }

    #[test]
    fn test_multibyte_delimiter_split_across_chunks() {
        let mut framer = MessageFramer::new("\r\n");
        assert!(framer.push(b"msg\r").is_empty());
        assert_eq!(framer.push(b"\n"), vec!["msg".to_string()]);
        assert!(framer.remainder().is_empty());
    }

    #[test]
    fn test_payload_containing_delimiter_is_split() {
        // No escaping on the wire: "a;b" sent as one message arrives as two.
        let mut framer = MessageFramer::new(";");
        assert_eq!(
            framer.push(b"a;b;"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_non_utf8_bytes_are_replaced_not_fatal() {
        let mut framer = MessageFramer::new(";");
        let messages = framer.push(&[0xFF, 0xFE, b'x', b';']);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with('x'));
    }

    #[test]
    fn test_clear_drops_remainder() {
        let mut framer = MessageFramer::new(";");
        framer.push(b"partial");
        assert_eq!(framer.remainder(), b"partial");
        framer.clear();
        assert!(framer.remainder().is_empty());
    }

    #[test]
    #[should_panic(expected = "delimiter must be non-empty")]
    fn test_empty_delimiter_panics() {
        let _ = MessageFramer::new("");
    }
}
