//! Character layer over byte streams
//!
//! [`CharReader`] decodes UTF-8 one character at a time from a buffered
//! source; [`CharWriter`] encodes characters into a sink. Malformed input
//! decodes to U+FFFD, so round-trips are exact only for valid UTF-8.

use crate::error::{CopyBenchError, IoPhase, IoPhaseExt, Result};
use std::io::{self, BufRead, Write};

const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Incremental UTF-8 decoder over a buffered source
pub struct CharReader<R> {
    inner: R,
    consumed: u64,
}

impl<R: BufRead> CharReader<R> {
    /// Wrap a buffered source
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Bytes consumed from the source so far
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Decode the next character, `None` at end-of-stream.
    ///
    /// Each maximal invalid prefix decodes to one U+FFFD, matching
    /// [`String::from_utf8_lossy`]. A byte that cannot continue the current
    /// sequence is left for the next call.
    pub fn read_char(&mut self) -> Result<Option<char>> {
        let lead = match self.peek_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        self.advance();

        // Sequence length, payload bits of the lead, allowed second byte
        let (len, mut code, second) = match lead {
            0x00..=0x7F => return Ok(Some(char::from(lead))),
            0xC2..=0xDF => (2, u32::from(lead & 0x1F), 0x80..=0xBF),
            0xE0 => (3, u32::from(lead & 0x0F), 0xA0..=0xBF),
            0xE1..=0xEC | 0xEE..=0xEF => (3, u32::from(lead & 0x0F), 0x80..=0xBF),
            0xED => (3, u32::from(lead & 0x0F), 0x80..=0x9F),
            0xF0 => (4, u32::from(lead & 0x07), 0x90..=0xBF),
            0xF1..=0xF3 => (4, u32::from(lead & 0x07), 0x80..=0xBF),
            0xF4 => (4, u32::from(lead & 0x07), 0x80..=0x8F),
            _ => return Ok(Some(REPLACEMENT)),
        };

        for i in 1..len {
            let allowed = if i == 1 { second.clone() } else { 0x80..=0xBF };
            match self.peek_byte()? {
                Some(b) if allowed.contains(&b) => {
                    self.advance();
                    code = (code << 6) | u32::from(b & 0x3F);
                }
                _ => return Ok(Some(REPLACEMENT)),
            }
        }

        Ok(Some(char::from_u32(code).unwrap_or(REPLACEMENT)))
    }

    /// Append up to `max` characters to `dst`, returning how many were read
    pub fn read_chars(&mut self, dst: &mut String, max: usize) -> Result<usize> {
        let mut count = 0;
        while count < max {
            match self.read_char()? {
                Some(c) => {
                    dst.push(c);
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CopyBenchError::io(IoPhase::Read, e)),
            }
        }
    }

    fn advance(&mut self) {
        self.inner.consume(1);
        self.consumed += 1;
    }
}

/// UTF-8 encoder over a sink
pub struct CharWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CharWriter<W> {
    /// Wrap a sink
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Encoded bytes handed to the sink so far
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Encode a single character
    pub fn write_char(&mut self, c: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write_str(c.encode_utf8(&mut buf))
    }

    /// Encode a run of characters
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.inner.write_all(s.as_bytes()).in_phase(IoPhase::Write)?;
        self.written += s.len() as u64;
        Ok(())
    }

    /// Push buffered data down to the sink
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().in_phase(IoPhase::Flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn decode(bytes: &[u8]) -> String {
        let mut reader = CharReader::new(BufReader::with_capacity(3, Cursor::new(bytes)));
        let mut out = String::new();
        while let Some(c) = reader.read_char().unwrap() {
            out.push(c);
        }
        assert_eq!(reader.bytes_consumed(), bytes.len() as u64);
        out
    }

    #[test]
    fn test_decode_ascii() {
        assert_eq!(decode(b"abcde"), "abcde");
    }

    #[test]
    fn test_decode_multibyte_across_buffer_refills() {
        let text = "añ€𝄞z";
        assert_eq!(decode(text.as_bytes()), text);
    }

    #[test]
    fn test_decode_malformed_sequences() {
        // stray continuation byte
        assert_eq!(decode(&[b'a', 0x80, b'b']), "a\u{FFFD}b");
        // truncated three-byte sequence followed by ASCII
        assert_eq!(decode(&[0xE2, 0x82, b'x']), "\u{FFFD}x");
        // overlong encoding of '/'
        assert_eq!(decode(&[0xC0, 0xAF]), "\u{FFFD}\u{FFFD}");
        // encoded surrogate
        assert_eq!(decode(&[0xED, 0xA0, 0x80]), "\u{FFFD}\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_malformed_input_matches_std_lossy() {
        let cases: &[&[u8]] = &[
            &[0xE0, 0x80, 0x80],
            &[0xED, 0xA0, 0x80],
            &[0xF0, 0x80, 0x80, 0x80],
            &[0xF4, 0x90, 0x80, 0x80],
            &[0xF5, 0x80, b'a'],
            &[0xC1, 0xBF],
            &[0xF0, 0x9F, 0x98, b'!'],
            &[0xE2, 0x82],
            &[b'o', b'k', 0xFF, 0xC3, 0xA9],
        ];
        for bytes in cases {
            assert_eq!(decode(bytes), String::from_utf8_lossy(bytes), "input {:02X?}", bytes);
        }
    }

    mod properties {
        use super::decode;
        use proptest::prelude::*;

        proptest! {
            /// Replacement follows the standard lossy decoder for any bytes
            #[test]
            fn decode_matches_std_lossy(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
                prop_assert_eq!(decode(&bytes), String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }

    #[test]
    fn test_read_chars_respects_max() {
        let mut reader = CharReader::new(Cursor::new("héllo".as_bytes()));
        let mut block = String::new();
        assert_eq!(reader.read_chars(&mut block, 2).unwrap(), 2);
        assert_eq!(block, "hé");
        block.clear();
        assert_eq!(reader.read_chars(&mut block, 10).unwrap(), 3);
        assert_eq!(block, "llo");
        assert_eq!(reader.read_chars(&mut block, 10).unwrap(), 0);
    }

    #[test]
    fn test_writer_counts_encoded_bytes() {
        let mut writer = CharWriter::new(Vec::new());
        writer.write_char('€').unwrap();
        writer.write_str("ab").unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.bytes_written(), 5);
    }
}
