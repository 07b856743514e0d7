//! Output decoding.
//!
//! The emulator sometimes emits several NUL-terminated messages in one write,
//! so a raw read is split on NUL bytes before it reaches the log. Newlines are
//! left inside fragments.

use std::mem;

/// Splits one read into text fragments on NUL bytes.
///
/// Empty fragments are dropped and invalid UTF-8 is replaced lossily.
pub fn split_fragments(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

/// Stateful decoder for a byte stream arriving in arbitrary reads.
///
/// A multi-byte UTF-8 sequence cut by a read boundary is held back until the
/// next read instead of being replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct OutputDecoder {
    pending: Vec<u8>,
}

impl OutputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one read, returning the fragments it completes.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let keep = incomplete_utf8_suffix(&self.pending);
        let tail = self.pending.split_off(self.pending.len() - keep);
        let fragments = split_fragments(&self.pending);
        self.pending = tail;
        fragments
    }

    /// Flushes whatever is still held back. Called once at end of stream.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = mem::take(&mut self.pending);
        split_fragments(&rest)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Length of a trailing, not yet complete UTF-8 sequence.
fn incomplete_utf8_suffix(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let byte = bytes[len - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return 0,
        };
        return if back < needed { back } else { 0 };
    }
    0
}

/// Reassembles fragments into complete lines.
///
/// Used where a consumer wants whole lines (console and tracing output)
/// rather than the raw fragment stream.
#[derive(Debug, Default)]
pub struct LineAssembler {
    partial: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one fragment, returning every line it completes without the terminator.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.partial.push_str(fragment);
        let mut lines = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let mut line: String = self.partial.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Returns the unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.partial))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_nul() {
        assert_eq!(split_fragments(b"one\0two\0three"), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_split_drops_empty_fragments() {
        assert_eq!(split_fragments(b"\0\0a\0\0b\0"), vec!["a", "b"]);
        assert!(split_fragments(b"").is_empty());
        assert!(split_fragments(b"\0").is_empty());
    }

    #[test]
    fn test_split_keeps_newlines() {
        assert_eq!(split_fragments(b"line1\nline2\n"), vec!["line1\nline2\n"]);
    }

    #[test]
    fn test_split_replaces_invalid_utf8() {
        assert_eq!(split_fragments(b"a\xffb"), vec!["a\u{fffd}b"]);
    }

    #[test]
    fn test_decoder_carries_split_multibyte_sequence() {
        let mut decoder = OutputDecoder::new();
        // "é" is C3 A9
        assert_eq!(decoder.push(&[b'a', 0xC3]), vec!["a"]);
        assert!(decoder.has_pending());
        assert_eq!(decoder.push(&[0xA9, b'b']), vec!["éb"]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_decoder_carries_four_byte_sequence() {
        let mut decoder = OutputDecoder::new();
        let crab = "🦀".as_bytes();
        assert!(decoder.push(&crab[..3]).is_empty());
        assert_eq!(decoder.push(&crab[3..]), vec!["🦀"]);
    }

    #[test]
    fn test_decoder_finish_flushes_truncated_sequence() {
        let mut decoder = OutputDecoder::new();
        assert!(decoder.push(&[0xE2, 0x82]).is_empty());
        assert_eq!(decoder.finish(), vec!["\u{fffd}"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_decoder_does_not_hold_back_invalid_lead_byte() {
        let mut decoder = OutputDecoder::new();
        assert_eq!(decoder.push(&[b'x', 0xFF]), vec!["x\u{fffd}"]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_line_assembler_joins_fragments() {
        let mut lines = LineAssembler::new();
        assert!(lines.push("li").is_empty());
        assert_eq!(lines.push("ne1\nline2\r\nli"), vec!["line1", "line2"]);
        assert_eq!(lines.finish(), Some("li".to_string()));
        assert_eq!(lines.finish(), None);
    }
}
