//! Error types for the download module.
//!
//! Every failure is terminal for its session. Each variant carries enough
//! context (host, address, byte counts) to explain which download failed and
//! how far it got.

use std::io;
use std::net::SocketAddr;

use serde::Serialize;
use thiserror::Error;

/// Errors that end a download session.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The host name could not be resolved to an IPv4 address.
    #[error("DNS resolution failed for {host}: {source}")]
    DnsFailure {
        /// The host that failed to resolve.
        host: String,
        /// The underlying resolver error.
        #[source]
        source: io::Error,
    },

    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailure {
        /// The resolved address that refused or timed out.
        addr: SocketAddr,
        /// The underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Writing the request failed.
    #[error("failed to send request to {host}: {source}")]
    SendFailure {
        /// The host the request was addressed to.
        host: String,
        /// The underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Reading the response failed.
    #[error("failed to receive response from {host}: {source}")]
    ReceiveFailure {
        /// The host the response was read from.
        host: String,
        /// The underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The header grew past its cap before the terminator arrived.
    #[error("response header from {host} exceeded {limit} bytes without a terminator")]
    HeaderTooLarge {
        /// The host that sent the oversized header.
        host: String,
        /// The header cap in bytes.
        limit: usize,
    },

    /// The peer closed the connection before the header terminator.
    #[error("{host} closed the connection after {received} header bytes, before the header ended")]
    UnexpectedEof {
        /// The host that closed the connection.
        host: String,
        /// Header bytes accumulated before the close.
        received: usize,
    },

    /// The header declared no usable body length.
    ///
    /// Covers an absent header line, a value that is not an integer, and a
    /// value that is zero or negative.
    #[error("response from {host} has no positive Content-Length{}", describe_value(.value))]
    MissingContentLength {
        /// The host that sent the header.
        host: String,
        /// The raw header value, when a `Content-Length` line was present.
        value: Option<String>,
    },

    /// The peer closed the connection before the whole body arrived.
    #[error("{host} closed the connection after {received} of {expected} body bytes")]
    PrematureClose {
        /// The host that closed the connection.
        host: String,
        /// Body bytes received before the close.
        received: usize,
        /// Body length declared by the header.
        expected: usize,
    },
}

fn describe_value(value: &Option<String>) -> String {
    match value {
        Some(raw) => format!(" (got {raw:?})"),
        None => String::new(),
    }
}

/// Classification of a [`DownloadError`], independent of its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// See [`DownloadError::DnsFailure`].
    Dns,
    /// See [`DownloadError::ConnectFailure`].
    Connect,
    /// See [`DownloadError::SendFailure`].
    Send,
    /// See [`DownloadError::ReceiveFailure`].
    Receive,
    /// See [`DownloadError::HeaderTooLarge`].
    HeaderTooLarge,
    /// See [`DownloadError::UnexpectedEof`].
    UnexpectedEof,
    /// See [`DownloadError::MissingContentLength`].
    MissingContentLength,
    /// See [`DownloadError::PrematureClose`].
    PrematureClose,
}

impl FailureKind {
    /// Returns the stable label used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Send => "send",
            Self::Receive => "receive",
            Self::HeaderTooLarge => "header_too_large",
            Self::UnexpectedEof => "unexpected_eof",
            Self::MissingContentLength => "missing_content_length",
            Self::PrematureClose => "premature_close",
        }
    }
}

impl DownloadError {
    /// Creates a DNS failure.
    pub fn dns(host: impl Into<String>, source: io::Error) -> Self {
        Self::DnsFailure {
            host: host.into(),
            source,
        }
    }

    /// Creates a connect failure.
    #[must_use]
    pub fn connect(addr: SocketAddr, source: io::Error) -> Self {
        Self::ConnectFailure { addr, source }
    }

    /// Creates a send failure.
    pub fn send(host: impl Into<String>, source: io::Error) -> Self {
        Self::SendFailure {
            host: host.into(),
            source,
        }
    }

    /// Creates a receive failure.
    pub fn receive(host: impl Into<String>, source: io::Error) -> Self {
        Self::ReceiveFailure {
            host: host.into(),
            source,
        }
    }

    /// Creates an oversized-header error.
    pub fn header_too_large(host: impl Into<String>, limit: usize) -> Self {
        Self::HeaderTooLarge {
            host: host.into(),
            limit,
        }
    }

    /// Creates an end-of-stream-before-header error.
    pub fn unexpected_eof(host: impl Into<String>, received: usize) -> Self {
        Self::UnexpectedEof {
            host: host.into(),
            received,
        }
    }

    /// Creates a missing or invalid Content-Length error.
    pub fn missing_content_length(host: impl Into<String>, value: Option<String>) -> Self {
        Self::MissingContentLength {
            host: host.into(),
            value,
        }
    }

    /// Creates an end-of-stream-before-body-complete error.
    pub fn premature_close(host: impl Into<String>, received: usize, expected: usize) -> Self {
        Self::PrematureClose {
            host: host.into(),
            received,
            expected,
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::DnsFailure { .. } => FailureKind::Dns,
            Self::ConnectFailure { .. } => FailureKind::Connect,
            Self::SendFailure { .. } => FailureKind::Send,
            Self::ReceiveFailure { .. } => FailureKind::Receive,
            Self::HeaderTooLarge { .. } => FailureKind::HeaderTooLarge,
            Self::UnexpectedEof { .. } => FailureKind::UnexpectedEof,
            Self::MissingContentLength { .. } => FailureKind::MissingContentLength,
            Self::PrematureClose { .. } => FailureKind::PrematureClose,
        }
    }
}

// No `From<io::Error>`: every variant needs the host or address, which the
// io error does not carry. Use the constructors above.
