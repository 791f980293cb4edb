//! Inbound line framing
//!
//! Splits client input on `\n` and decodes each line lossily, so a stray
//! non-UTF-8 byte becomes U+FFFD instead of a dead session. Lines longer than
//! the cap are skipped whole and reported as [`InboundLine::Overlong`];
//! decoding resumes at the next line.

use bytes::BytesMut;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder};

/// Longest accepted input line in bytes
pub const MAX_LINE_LENGTH: usize = 8192;

/// Codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One decoded unit of client input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    Text(String),
    /// A line over the cap was dropped
    Overlong,
}

/// `\n`-delimited, lossy UTF-8 line decoder
pub struct ChatLineCodec {
    inner: AnyDelimiterCodec,
}

impl ChatLineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_length),
        }
    }
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_line(chunk: &[u8]) -> String {
    let chunk = chunk.strip_suffix(b"\r").unwrap_or(chunk);
    String::from_utf8_lossy(chunk).into_owned()
}

fn map_result(
    result: Result<Option<bytes::Bytes>, AnyDelimiterCodecError>,
) -> Result<Option<InboundLine>, CodecError> {
    match result {
        Ok(Some(chunk)) => Ok(Some(InboundLine::Text(to_line(&chunk)))),
        Ok(None) => Ok(None),
        // The inner codec is now discarding up to the next delimiter
        Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => Ok(Some(InboundLine::Overlong)),
        Err(AnyDelimiterCodecError::Io(e)) => Err(CodecError::Io(e)),
    }
}

impl Decoder for ChatLineCodec {
    type Item = InboundLine;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        map_result(self.inner.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        map_result(self.inner.decode_eof(src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut ChatLineCodec, input: &[u8]) -> Vec<InboundLine> {
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(line) = codec.decode(&mut buf).unwrap() {
            out.push(line);
        }
        out
    }

    fn text(s: &str) -> InboundLine {
        InboundLine::Text(s.to_string())
    }

    #[test]
    fn test_splits_lines_and_strips_cr() {
        let mut codec = ChatLineCodec::new();
        let lines = decode_all(&mut codec, b"hello\r\nworld\n\npartial");
        assert_eq!(lines, vec![text("hello"), text("world"), text("")]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = ChatLineCodec::new();
        let lines = decode_all(&mut codec, b"caf\xe9\nstill here\n");
        assert_eq!(lines, vec![text("caf\u{fffd}"), text("still here")]);
    }

    #[test]
    fn test_overlong_line_is_skipped() {
        let mut codec = ChatLineCodec::with_max_length(8);
        let lines = decode_all(&mut codec, b"short\nthis line is far too long\nnext\n");
        assert_eq!(lines, vec![text("short"), InboundLine::Overlong, text("next")]);
    }

    #[test]
    fn test_eof_flushes_trailing_line() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from(&b"bye"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some(text("bye")));
    }
}
