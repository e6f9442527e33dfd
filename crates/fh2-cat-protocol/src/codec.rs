//! Line-based codec for CAT communication.
//!
//! The radio terminates responses with `;`, a newline, or both. A line ends
//! at `\r` or `\n` (the terminator is dropped) or right after `;` (the `;` is
//! kept, it is part of the response text).

use bytes::BytesMut;

/// Maximum response line length before the buffer is force-flushed.
pub const MAX_LINE_LENGTH: usize = 256;

/// CAT command terminator.
pub const COMMAND_TERMINATOR: u8 = b';';

/// A codec for reading CAT response lines and writing commands.
///
/// This handles the line-based nature of the CAT protocol:
/// - Accumulates received bytes until a complete line is found
/// - Keeps partial lines across reads
/// - Skips blank lines and surrounding whitespace
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH * 2),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete line from the buffer.
    ///
    /// Returns `Some(line)` with surrounding whitespace removed, or `None` if
    /// more data is needed. Blank lines are consumed and never returned.
    pub fn decode_line(&mut self) -> Option<String> {
        loop {
            let terminator = self
                .buffer
                .iter()
                .position(|&b| b == b'\r' || b == b'\n' || b == COMMAND_TERMINATOR);

            let line_data = match terminator {
                Some(end) if self.buffer[end] == COMMAND_TERMINATOR => {
                    self.buffer.split_to(end + 1)
                }
                Some(end) => {
                    let data = self.buffer.split_to(end);
                    let _ = self.buffer.split_to(1);
                    data
                }
                None if self.buffer.len() >= MAX_LINE_LENGTH => {
                    log::warn!(
                        "no terminator in {} buffered bytes, flushing as a line",
                        self.buffer.len()
                    );
                    self.buffer.split()
                }
                None => return None,
            };

            let line = String::from_utf8_lossy(&line_data);
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }

    /// Encode a command for transmission.
    ///
    /// Commands already carry their `;` terminator, so the text is sent as is.
    pub fn encode_command(cmd: &str) -> Vec<u8> {
        cmd.as_bytes().to_vec()
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        assert_eq!(LineCodec::encode_command("AG0128;"), b"AG0128;");
    }

    #[test]
    fn test_decode_newline_terminated() {
        let mut codec = LineCodec::new();
        codec.push(b"ML1025\r\n");

        assert_eq!(codec.decode_line(), Some("ML1025".to_string()));
        assert!(codec.decode_line().is_none());
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_decode_semicolon_terminated() {
        let mut codec = LineCodec::new();
        codec.push(b"AG?255;BI1;");

        assert_eq!(codec.decode_line(), Some("AG?255;".to_string()));
        assert_eq!(codec.decode_line(), Some("BI1;".to_string()));
        assert!(codec.decode_line().is_none());
    }

    #[test]
    fn test_semicolon_then_newline_yields_one_line() {
        let mut codec = LineCodec::new();
        codec.push(b"AG?100;\r\nML1050\n");

        assert_eq!(codec.decode_line(), Some("AG?100;".to_string()));
        assert_eq!(codec.decode_line(), Some("ML1050".to_string()));
        assert!(codec.decode_line().is_none());
    }

    #[test]
    fn test_partial_line_kept_across_pushes() {
        let mut codec = LineCodec::new();
        codec.push(b"AG?2");
        assert!(codec.decode_line().is_none());
        assert_eq!(codec.buffer_as_str(), "AG?2");

        codec.push(b"55");
        assert!(codec.decode_line().is_none());

        codec.push(b";");
        assert_eq!(codec.decode_line(), Some("AG?255;".to_string()));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut codec = LineCodec::new();
        codec.push(b"\r\n\r\n  \nBI0\n");

        assert_eq!(codec.decode_line(), Some("BI0".to_string()));
        assert!(codec.decode_line().is_none());
    }

    #[test]
    fn test_overlong_line_flushed() {
        let mut codec = LineCodec::new();
        codec.push(&[b'X'; MAX_LINE_LENGTH]);

        let line = codec.decode_line().expect("overlong data should be flushed");
        assert_eq!(line.len(), MAX_LINE_LENGTH);
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_invalid_utf8_decoded_lossily() {
        let mut codec = LineCodec::new();
        codec.push(b"BI\xff\n");

        let line = codec.decode_line().unwrap();
        assert!(line.starts_with("BI"));
    }

    #[test]
    fn test_clear() {
        let mut codec = LineCodec::new();
        codec.push(b"partial");
        codec.clear();
        assert_eq!(codec.buffered_len(), 0);
    }
}
