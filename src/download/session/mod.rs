//! Download sessions and the styles that drive them.
//!
//! A session connects, sends the request, accumulates the header and streams
//! the body, strictly in that order. The protocol pieces
//! ([`RequestEmitter`](super::RequestEmitter),
//! [`HeaderAccumulator`](super::HeaderAccumulator),
//! [`BodyBuffer`](super::BodyBuffer)) are shared; each [`Style`] only decides
//! how the session suspends across I/O:
//!
//! - [`Style::Callback`] - an explicit state machine whose completion
//!   handlers pick the next step ([`callback`])
//! - [`Style::Chained`] - futures composed with `and_then` and the
//!   [`repeat_while`] loop combinator ([`chained`])
//! - [`Style::Awaiting`] - a linear `async fn` ([`awaiting`])
//!
//! All three produce the same bodies and the same error kinds for the same
//! byte stream, and close the connection exactly once before reporting.

pub mod awaiting;
pub mod callback;
pub mod chained;
mod repeat;

use std::fmt;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;

pub use callback::{CallbackSession, DownloadResult, download_with_callback};
pub use repeat::{RepeatWhile, repeat_while};

use super::{Connector, DownloadError, SessionConfig, TcpConnector};

/// The resource a session fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name, sent in the `Host` header and resolved for the connection.
    pub host: String,
    /// Request path, sent verbatim on the request line.
    pub path: String,
}

impl Target {
    /// Creates a target for `path` on `host`.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }
}

/// How a session expresses suspension across I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    /// Explicit state machine with completion handlers.
    #[value(alias = "1")]
    Callback,
    /// Futures chained through continuations.
    #[value(alias = "2")]
    Chained,
    /// Linear suspend/resume code.
    #[default]
    #[value(alias = "3")]
    Awaiting,
}

impl Style {
    /// Every style, in menu order.
    pub const ALL: [Style; 3] = [Style::Callback, Style::Chained, Style::Awaiting];

    /// Returns the stable label used in logs, config files and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Callback => "callback",
            Self::Chained => "chained",
            Self::Awaiting => "awaiting",
        }
    }

    /// Parses a label produced by [`as_str`](Self::as_str).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Starts download sessions with a fixed connector, configuration and style.
///
/// Sessions share nothing but the connector, so any number may run
/// concurrently.
///
/// # Example
///
/// ```no_run
/// use rawfetch_core::download::{Downloader, SessionConfig, Style};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = Downloader::tcp(SessionConfig::default(), Style::Awaiting);
/// let body = downloader.download("httpbin.org", "/html").await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
pub struct Downloader<C> {
    connector: Arc<C>,
    config: SessionConfig,
    style: Style,
}

impl<C> fmt::Debug for Downloader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl<C> Clone for Downloader<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            config: self.config,
            style: self.style,
        }
    }
}

impl Downloader<TcpConnector> {
    /// Creates a downloader that connects over TCP.
    #[must_use]
    pub fn tcp(config: SessionConfig, style: Style) -> Self {
        Self::new(TcpConnector, config, style)
    }
}

impl<C: Connector> Downloader<C> {
    /// Creates a downloader around `connector`.
    pub fn new(connector: C, config: SessionConfig, style: Style) -> Self {
        Self {
            connector: Arc::new(connector),
            config,
            style,
        }
    }

    /// Returns the session style.
    #[must_use]
    pub fn style(&self) -> Style {
        self.style
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the same downloader with a different style.
    #[must_use]
    pub fn with_style(&self, style: Style) -> Self {
        Self {
            style,
            ..self.clone()
        }
    }

    /// Downloads `path` from `host` and resolves to the response body.
    ///
    /// The returned future owns everything it needs; dropping it before
    /// completion drops the connection without a shutdown.
    pub fn download(
        &self,
        host: &str,
        path: &str,
    ) -> BoxFuture<'static, Result<Vec<u8>, DownloadError>> {
        let connector = Arc::clone(&self.connector);
        let target = Target::new(host, path);
        match self.style {
            Style::Callback => callback::download(connector, self.config, target).boxed(),
            Style::Chained => chained::download(connector, self.config, target),
            Style::Awaiting => awaiting::download(connector, self.config, target).boxed(),
        }
    }
}
