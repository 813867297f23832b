//! HTTP/1.1 downloads over a raw byte stream.
//!
//! This module fetches a resource with a single `GET` on a fresh connection
//! and returns the response body, handling the stream at the buffer level.
//!
//! # Features
//!
//! - Header accumulation across arbitrarily split reads, capped at four
//!   read chunks (32 KiB by default)
//! - `Content-Length` extraction; body bytes that arrive with the header are
//!   kept
//! - Body streamed straight into a buffer of the declared length
//! - Three interchangeable session styles (see [`Style`])
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use rawfetch_core::download::{Downloader, SessionConfig, Style};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::tcp(SessionConfig::default(), Style::Callback);
//! let body = downloader.download("www.cs.ubbcluj.ro", "/~rlupsa/edu/pdp/").await?;
//! println!("Downloaded {} bytes", body.len());
//! # Ok(())
//! # }
//! ```

mod batch;
mod body;
mod config;
mod constants;
mod error;
mod header;
mod request;
pub mod session;
mod transport;

pub use batch::{BatchReport, DEFAULT_JOBS, DownloadJob, JobOutcome, JobParseError, run_batch};
pub use body::BodyBuffer;
pub use config::{ConfigError, SessionConfig};
pub use constants::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT, HEADER_TERMINATOR};
pub use error::{DownloadError, FailureKind};
pub use header::{HeaderAccumulator, parse_content_length};
pub use request::{RequestEmitter, build_request};
pub use session::{
    CallbackSession, DownloadResult, Downloader, Style, Target, download_with_callback,
    repeat_while,
};
pub use transport::{Connector, TcpConnector, Transport};

// Note: no module-local Result alias. Use `Result<T, DownloadError>`
// explicitly in function signatures.
