//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use rawfetch_core::{DownloadJob, Style};

/// Download resources over raw HTTP/1.1 and save their bodies.
///
/// Every job runs concurrently on its own connection. Without any JOBS the
/// built-in list is fetched.
#[derive(Parser, Debug)]
#[command(name = "rawfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Jobs as HOST/PATH=NAME or http://HOST/PATH=NAME
    #[arg(value_name = "JOBS")]
    pub jobs: Vec<DownloadJob>,

    /// Session style: callback (1), chained (2) or awaiting (3)
    #[arg(short, long, value_enum)]
    pub style: Option<Style>,

    /// TCP port used for every job [default: 80]
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Bytes requested per read; the header cap is four reads [default: 8192]
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Directory the bodies are written to [default: .]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Read defaults from this file instead of the standard location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
