//! Rawfetch Core Library
//!
//! This library fetches resources over plain HTTP/1.1 on a raw TCP
//! connection and returns the assembled response body. The protocol is
//! implemented once and driven by three interchangeable concurrency styles.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - transport, protocol engine, session styles and batch
//!   fan-out

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;

// Re-export commonly used types
pub use download::{
    BatchReport, Connector, DEFAULT_JOBS, DownloadError, DownloadJob, Downloader, FailureKind,
    JobOutcome, SessionConfig, Style, TcpConnector, run_batch,
};
