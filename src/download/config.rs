//! Per-session tuning: target port and read chunk size.

use super::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_PORT, HEADER_LIMIT_CHUNKS, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};

/// Error type for invalid session configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Port zero cannot be connected to.
    #[error("invalid port 0: must be between 1 and 65535")]
    InvalidPort,

    /// Chunk size outside the accepted range.
    #[error(
        "invalid chunk size {value}: must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE} bytes"
    )]
    InvalidChunkSize {
        /// The rejected value.
        value: usize,
    },
}

/// Settings shared by every session a [`Downloader`](super::Downloader) starts.
///
/// The header cap is not configured separately; it is always
/// [`HEADER_LIMIT_CHUNKS`] times the chunk size (32768 bytes by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    port: u16,
    chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SessionConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] for port 0 and
    /// [`ConfigError::InvalidChunkSize`] when the chunk size is outside
    /// [`MIN_CHUNK_SIZE`]..=[`MAX_CHUNK_SIZE`].
    pub fn new(port: u16, chunk_size: usize) -> Result<Self, ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(ConfigError::InvalidChunkSize { value: chunk_size });
        }
        Ok(Self { port, chunk_size })
    }

    /// Returns the TCP port sessions connect to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the size of a single read.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the most header bytes a session buffers before giving up.
    #[must_use]
    pub fn header_limit(&self) -> usize {
        self.chunk_size * HEADER_LIMIT_CHUNKS
    }
}
