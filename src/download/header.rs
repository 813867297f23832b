//! Header accumulation and Content-Length extraction.
//!
//! The header arrives in arbitrary pieces. [`HeaderAccumulator`] appends each
//! read to a growing buffer and looks for the `\r\n\r\n` terminator. The
//! search is incremental: each pass only covers the new tail plus the last
//! three bytes of the previous pass, which finds the same offset a full
//! re-scan from the start would.

use tracing::debug;

use super::body::BodyBuffer;
use super::config::SessionConfig;
use super::constants::{CONTENT_LENGTH_PREFIX, HEADER_TERMINATOR};
use super::DownloadError;

/// Accumulates the response header until its terminator is seen.
#[derive(Debug)]
pub struct HeaderAccumulator {
    host: String,
    scratch: Vec<u8>,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already proven not to start a terminator.
    scanned: usize,
    /// Offset just past the terminator, once found.
    header_end: Option<usize>,
    limit: usize,
    chunk_size: usize,
}

impl HeaderAccumulator {
    /// Creates an empty accumulator for a response from `host`.
    #[must_use]
    pub fn new(host: &str, config: &SessionConfig) -> Self {
        Self {
            host: host.to_string(),
            scratch: vec![0; config.chunk_size()],
            buffer: Vec::with_capacity(config.chunk_size()),
            scanned: 0,
            header_end: None,
            limit: config.header_limit(),
            chunk_size: config.chunk_size(),
        }
    }

    /// Returns the buffer the next read should fill.
    pub fn scratch(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    /// Returns true once the terminator has been found.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.header_end.is_some()
    }

    /// Returns the number of bytes accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true before anything has been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends the first `n` bytes of the scratch buffer.
    ///
    /// Returns `Ok(true)` once the terminator has been found.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::UnexpectedEof`] when `n == 0` (peer closed)
    /// - [`DownloadError::HeaderTooLarge`] when the buffer outgrows its cap
    ///   without containing the terminator
    pub fn accept(&mut self, n: usize) -> Result<bool, DownloadError> {
        if n == 0 {
            return Err(DownloadError::unexpected_eof(&self.host, self.buffer.len()));
        }
        let n = n.min(self.scratch.len());
        self.buffer.extend_from_slice(&self.scratch[..n]);

        let from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
        if let Some(pos) = find_terminator(&self.buffer[from..]) {
            let end = from + pos + HEADER_TERMINATOR.len();
            debug!(header_bytes = end, buffered = self.buffer.len(), "header complete");
            self.header_end = Some(end);
            return Ok(true);
        }
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.limit {
            return Err(DownloadError::header_too_large(&self.host, self.limit));
        }
        Ok(false)
    }

    /// Parses the completed header and seeds the body buffer with any body
    /// bytes that arrived alongside it.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::MissingContentLength`] when the header declares no
    ///   positive length
    /// - [`DownloadError::UnexpectedEof`] if called before the terminator was
    ///   found
    pub fn into_body(self) -> Result<BodyBuffer, DownloadError> {
        let Some(end) = self.header_end else {
            return Err(DownloadError::unexpected_eof(&self.host, self.buffer.len()));
        };
        let content_length = parse_content_length(&self.buffer[..end])
            .map_err(|value| DownloadError::missing_content_length(&self.host, value))?;
        Ok(BodyBuffer::new(
            self.host,
            content_length,
            &self.buffer[end..],
            self.chunk_size,
        ))
    }
}

/// Returns the offset where the first `\r\n\r\n` starts.
fn find_terminator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Extracts a positive `Content-Length` from raw header bytes.
///
/// The first line starting with `Content-Length:` (any case) wins; its
/// remainder is trimmed and parsed as a 32-bit signed integer.
///
/// # Errors
///
/// Returns `Err(None)` when no such line exists and `Err(Some(raw))` when the
/// value is not an integer or is not positive.
pub fn parse_content_length(header: &[u8]) -> Result<usize, Option<String>> {
    let text = String::from_utf8_lossy(header);
    let prefix_len = CONTENT_LENGTH_PREFIX.len();
    let raw = text
        .split("\r\n")
        .find(|line| {
            line.get(..prefix_len)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CONTENT_LENGTH_PREFIX))
        })
        .map(|line| line[prefix_len..].trim())
        .ok_or(None)?;

    match raw.parse::<i32>() {
        Ok(length) if length > 0 => usize::try_from(length).map_err(|_| Some(raw.to_string())),
        _ => Err(Some(raw.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(chunk_size: usize) -> SessionConfig {
        SessionConfig::new(80, chunk_size).unwrap()
    }

    /// Feeds `data` through the accumulator in pieces of `step` bytes.
    fn feed(acc: &mut HeaderAccumulator, data: &[u8], step: usize) -> Result<bool, DownloadError> {
        let mut done = false;
        for piece in data.chunks(step) {
            acc.scratch()[..piece.len()].copy_from_slice(piece);
            done = acc.accept(piece.len())?;
            if done {
                break;
            }
        }
        Ok(done)
    }

    #[test]
    fn test_incremental_search_matches_full_scan_for_every_split() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-A: b\r\n\r\nhello";
        let expected = find_terminator(response).unwrap() + 4;

        for step in 1..=response.len().min(16) {
            let mut acc = HeaderAccumulator::new("h", &config(16));
            assert!(feed(&mut acc, response, step).unwrap(), "step {step}");
            assert_eq!(acc.header_end, Some(expected), "step {step}");
        }
    }

    #[test]
    fn test_terminator_split_across_reads() {
        let mut acc = HeaderAccumulator::new("h", &config(32));
        let first = b"HTTP/1.1 200 OK\r\n\r";
        let second = b"\nbody";
        acc.scratch()[..first.len()].copy_from_slice(first);
        assert!(!acc.accept(first.len()).unwrap());
        acc.scratch()[..second.len()].copy_from_slice(second);
        assert!(acc.accept(second.len()).unwrap());
        assert_eq!(acc.header_end, Some(first.len() + 1));
    }

    #[test]
    fn test_zero_read_is_unexpected_eof() {
        let mut acc = HeaderAccumulator::new("h", &config(16));
        acc.scratch()[..4].copy_from_slice(b"HTTP");
        acc.accept(4).unwrap();
        let err = acc.accept(0).unwrap_err();
        assert!(matches!(err, DownloadError::UnexpectedEof { received: 4, .. }));
    }

    #[test]
    fn test_header_exceeding_cap_is_rejected() {
        let mut acc = HeaderAccumulator::new("h", &config(16));
        let junk = [b'a'; 16];
        for _ in 0..4 {
            acc.scratch().copy_from_slice(&junk);
            assert!(!acc.accept(16).unwrap());
        }
        // 64 bytes is exactly the cap; one more byte crosses it.
        acc.scratch()[0] = b'a';
        let err = acc.accept(1).unwrap_err();
        assert!(matches!(err, DownloadError::HeaderTooLarge { limit: 64, .. }));
    }

    #[test]
    fn test_terminator_wins_over_cap_in_same_read() {
        let mut acc = HeaderAccumulator::new("h", &config(16));
        let mut data = vec![b'a'; 62];
        data.extend_from_slice(b"\r\n\r\nbodybody");
        assert!(feed(&mut acc, &data, 16).unwrap());
        assert!(acc.len() > 64);
    }

    #[test]
    fn test_into_body_seeds_bundled_bytes() {
        let mut acc = HeaderAccumulator::new("h", &config(64));
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhel";
        assert!(feed(&mut acc, data, 64).unwrap());
        let body = acc.into_body().unwrap();
        assert_eq!(body.len(), 5);
        assert_eq!(body.offset(), 3);
    }

    #[test]
    fn test_into_body_without_terminator_is_unexpected_eof() {
        let acc = HeaderAccumulator::new("h", &config(16));
        assert!(matches!(
            acc.into_body(),
            Err(DownloadError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_parse_content_length_case_insensitive() {
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\ncontent-length:  42 \r\n\r\n"),
            Ok(42)
        );
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\nCONTENT-LENGTH: 7\r\n\r\n"),
            Ok(7)
        );
    }

    #[test]
    fn test_parse_content_length_first_line_wins() {
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nContent-Length: 9\r\n\r\n"),
            Ok(3)
        );
    }

    #[test]
    fn test_parse_content_length_rejects_missing_invalid_and_non_positive() {
        assert_eq!(parse_content_length(b"HTTP/1.1 200 OK\r\n\r\n"), Err(None));
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\nContent-Length: abc\r\n\r\n"),
            Err(Some("abc".to_string()))
        );
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"),
            Err(Some("0".to_string()))
        );
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\nContent-Length: -5\r\n\r\n"),
            Err(Some("-5".to_string()))
        );
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\nContent-Length: 99999999999\r\n\r\n"),
            Err(Some("99999999999".to_string()))
        );
    }

    #[test]
    fn test_parse_content_length_ignores_similar_headers() {
        assert_eq!(
            parse_content_length(b"HTTP/1.1 200 OK\r\nX-Content-Length: 5\r\n\r\n"),
            Err(None)
        );
    }
}
