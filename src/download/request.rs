//! Request emission: the fixed GET request and its send progress.

use std::io;

use super::DownloadError;

/// Builds the request bytes for `GET path` on `host`.
///
/// Characters outside ASCII are replaced with `?`.
#[must_use]
pub fn build_request(host: &str, path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n")
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// Tracks how much of the request has been written.
///
/// Writes may be partial, so callers loop: write [`unsent`](Self::unsent),
/// report the count with [`advance`](Self::advance), until
/// [`is_complete`](Self::is_complete).
#[derive(Debug, Clone)]
pub struct RequestEmitter {
    host: String,
    bytes: Vec<u8>,
    sent: usize,
}

impl RequestEmitter {
    /// Prepares the request for `path` on `host`.
    #[must_use]
    pub fn new(host: &str, path: &str) -> Self {
        Self {
            host: host.to_string(),
            bytes: build_request(host, path),
            sent: 0,
        }
    }

    /// Returns the bytes not yet written.
    #[must_use]
    pub fn unsent(&self) -> &[u8] {
        &self.bytes[self.sent..]
    }

    /// Returns true once every byte has been written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sent == self.bytes.len()
    }

    /// Records the outcome of one write.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::SendFailure`] for a write error, and for a
    /// write that accepted zero bytes while data remained.
    pub fn advance(&mut self, written: io::Result<usize>) -> Result<(), DownloadError> {
        let n = written.map_err(|e| DownloadError::send(&self.host, e))?;
        if n == 0 && !self.is_complete() {
            return Err(DownloadError::send(
                &self.host,
                io::Error::new(io::ErrorKind::WriteZero, "connection accepted no request bytes"),
            ));
        }
        self.sent = (self.sent + n).min(self.bytes.len());
        Ok(())
    }
}
