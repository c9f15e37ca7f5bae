//! Frame extraction from the chunked response body.
//!
//! The backend frames events as repeated `data: <json>\n\n` records. Network
//! reads do not respect frame boundaries, so the splitter keeps an incomplete
//! trailing fragment buffered until the next read completes it.

use crate::defaults;

/// Incremental splitter that turns raw byte reads into frame payloads.
///
/// Buffers bytes rather than text so a read boundary that lands inside a
/// multi-byte UTF-8 sequence cannot corrupt the frame.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: Vec<u8>,
}

impl FrameSplitter {
    /// Creates a new splitter with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one network read and returns the payloads of every frame it
    /// completed, in arrival order.
    ///
    /// Only frames carrying the `data: ` prefix yield a payload (with the
    /// prefix stripped); comment and control frames are skipped, which keeps
    /// the transport forward-compatible.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = find_delimiter(&self.buffer) {
            let frame: Vec<u8> = self
                .buffer
                .drain(..pos + defaults::FRAME_DELIMITER.len())
                .take(pos)
                .collect();
            let text = String::from_utf8_lossy(&frame);
            let trimmed = text.trim();
            if let Some(payload) = trimmed.strip_prefix(defaults::DATA_PREFIX) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }

    /// Number of buffered bytes awaiting a frame delimiter.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Finds the first frame delimiter in `buffer`, if any.
fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(defaults::FRAME_DELIMITER.len())
        .position(|window| window == defaults::FRAME_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_frame() {
        let mut splitter = FrameSplitter::new();
        let payloads = splitter.push(b"data: {\"type\":\"complete\"}\n\n");
        assert_eq!(payloads, vec![r#"{"type":"complete"}"#.to_string()]);
        assert_eq!(splitter.pending_len(), 0);
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let mut splitter = FrameSplitter::new();
        let payloads = splitter.push(b"data: one\n\ndata: two\n\ndata: three\n\n");
        assert_eq!(payloads, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_partial_frame_spans_reads() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"data: {\"type\":").is_empty());
        assert!(splitter.pending_len() > 0);

        let payloads = splitter.push(b"\"audio_end\"}\n\n");
        assert_eq!(payloads, vec![r#"{"type":"audio_end"}"#.to_string()]);
        assert_eq!(splitter.pending_len(), 0);
    }

    #[test]
    fn test_delimiter_split_across_reads() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"data: x\n").is_empty());
        let payloads = splitter.push(b"\ndata: y\n\n");
        assert_eq!(payloads, vec!["x", "y"]);
    }

    #[test]
    fn test_non_data_frames_are_skipped() {
        let mut splitter = FrameSplitter::new();
        let payloads = splitter.push(b": keep-alive\n\nevent: ping\n\ndata: real\n\n");
        assert_eq!(payloads, vec!["real"]);
    }

    #[test]
    fn test_blank_frames_are_skipped() {
        let mut splitter = FrameSplitter::new();
        let payloads = splitter.push(b"\n\n\n\ndata: a\n\n");
        assert_eq!(payloads, vec!["a"]);
    }

    #[test]
    fn test_multibyte_utf8_split_across_reads() {
        let mut splitter = FrameSplitter::new();
        let frame = "data: {\"t\":\"¿Cómo estás?\"}\n\n".as_bytes();
        // Split inside the two-byte 'ó' sequence.
        let mid = frame.iter().position(|&b| b == 0xC3).unwrap() + 1;
        assert!(splitter.push(&frame[..mid]).is_empty());
        let payloads = splitter.push(&frame[mid..]);
        assert_eq!(payloads, vec![r#"{"t":"¿Cómo estás?"}"#.to_string()]);
    }

    #[test]
    fn test_trailing_fragment_stays_buffered() {
        let mut splitter = FrameSplitter::new();
        let payloads = splitter.push(b"data: whole\n\ndata: partial");
        assert_eq!(payloads, vec!["whole"]);
        assert_eq!(splitter.pending_len(), b"data: partial".len());
    }

    #[test]
    fn test_empty_read_yields_nothing() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"").is_empty());
    }
}
