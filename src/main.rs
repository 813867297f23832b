//! CLI entry point for the rawfetch tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rawfetch_core::download::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT};
use rawfetch_core::{BatchReport, DownloadJob, Downloader, JobOutcome, SessionConfig, run_batch};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, VerbositySetting, load_file_config};
use cli::Args;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Partial,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Partial => ExitCode::from(2),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    match run(args).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    let file = load_file_config(args.config.as_deref())?;
    init_tracing(&args, file.verbosity);
    debug!(?args, ?file, "configuration loaded");

    let settings = Settings::merge(args, file)?;
    info!(
        style = %settings.downloader.style(),
        port = settings.downloader.config().port(),
        jobs = settings.jobs.len(),
        "rawfetch starting"
    );

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                settings.output_dir.display()
            )
        })?;

    let report = run_batch(&settings.downloader, settings.jobs).await;
    let unsaved = save_bodies(report.outcomes(), &settings.output_dir).await;

    if settings.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to serialize the report")?;
        println!("{rendered}");
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        unsaved,
        total = report.outcomes().len(),
        "Download complete"
    );

    Ok(determine_exit_outcome(&report, unsaved))
}

// Priority: RUST_LOG env var > quiet flag > verbose flag > config file > default (info)
fn init_tracing(args: &Args, configured: Option<VerbositySetting>) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => configured.map_or("info", VerbositySetting::level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so `--json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Effective settings after layering CLI flags over the config file.
struct Settings {
    downloader: Downloader<rawfetch_core::TcpConnector>,
    output_dir: PathBuf,
    jobs: Vec<DownloadJob>,
    json: bool,
}

impl Settings {
    fn merge(args: Args, file: FileConfig) -> Result<Self> {
        let style = args.style.or(file.style).unwrap_or_default();
        let port = args.port.or(file.port).unwrap_or(DEFAULT_PORT);
        let chunk_size = args
            .chunk_size
            .or(file.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        let config = SessionConfig::new(port, chunk_size).context("Invalid session settings")?;

        let output_dir = args
            .output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let jobs = if args.jobs.is_empty() {
            info!("No jobs given, fetching the built-in list");
            DownloadJob::defaults()
        } else {
            args.jobs
        };

        Ok(Self {
            downloader: Downloader::tcp(config, style),
            output_dir,
            jobs,
            json: args.json,
        })
    }
}

/// Writes every downloaded body under `output_dir`.
///
/// Each write stands alone: a body that cannot be written is logged as that
/// job's failure and the rest are still saved. Returns how many bodies were
/// not written.
async fn save_bodies(outcomes: &[JobOutcome], output_dir: &Path) -> usize {
    let mut unsaved = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(body) => match save_body(output_dir, &outcome.job.output_name, body).await {
                Ok(path) => {
                    info!(job = %outcome.job, path = %path.display(), bytes = body.len(), "saved");
                }
                Err(e) => {
                    unsaved += 1;
                    warn!(job = %outcome.job, "not saved: {e:#}");
                }
            },
            Err(e) => {
                warn!(job = %outcome.job, kind = e.kind().as_str(), "not saved: {e}");
            }
        }
    }
    unsaved
}

async fn save_body(output_dir: &Path, name: &str, body: &[u8]) -> Result<PathBuf> {
    let path = output_dir.join(name);
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(path)
}

fn determine_exit_outcome(report: &BatchReport, unsaved: usize) -> ProcessExit {
    if report.failed() == 0 && unsaved == 0 {
        ProcessExit::Success
    } else {
        ProcessExit::Partial
    }
}
