//! Fixed-size body buffer filled in place.

use tracing::trace;

use super::DownloadError;

/// Holds exactly `Content-Length` bytes and the offset filled so far.
///
/// Invariant: `0 <= offset <= len`. The body is complete exactly when
/// `offset == len`.
#[derive(Debug)]
pub struct BodyBuffer {
    host: String,
    bytes: Vec<u8>,
    offset: usize,
    chunk_size: usize,
}

impl BodyBuffer {
    /// Allocates the body and copies in the bytes that arrived with the
    /// header. Bundled bytes past `content_length` are dropped.
    #[must_use]
    pub fn new(host: String, content_length: usize, bundled: &[u8], chunk_size: usize) -> Self {
        let mut bytes = vec![0; content_length];
        let seeded = bundled.len().min(content_length);
        bytes[..seeded].copy_from_slice(&bundled[..seeded]);
        if bundled.len() > content_length {
            trace!(
                extra = bundled.len() - content_length,
                "discarding bytes past declared length"
            );
        }
        Self {
            host,
            bytes,
            offset: seeded,
            chunk_size,
        }
    }

    /// Returns the declared body length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for an empty body. Never the case for a parsed response,
    /// since zero lengths are rejected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns how many body bytes have been filled.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns how many body bytes are still missing.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Returns true once every declared byte has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.offset == self.bytes.len()
    }

    /// Returns the slice the next read should fill:
    /// `min(chunk_size, remaining)` bytes starting at the offset.
    pub fn window(&mut self) -> &mut [u8] {
        let end = self.offset + self.chunk_size.min(self.remaining());
        &mut self.bytes[self.offset..end]
    }

    /// Records a read of `n` bytes into the current window.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::PrematureClose`] when `n == 0` while bytes
    /// are still missing.
    pub fn accept(&mut self, n: usize) -> Result<(), DownloadError> {
        if n == 0 && !self.is_complete() {
            return Err(DownloadError::premature_close(
                &self.host,
                self.offset,
                self.bytes.len(),
            ));
        }
        self.offset = (self.offset + n).min(self.bytes.len());
        Ok(())
    }

    /// Returns the body bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
