//! Concurrent fan-out of independent download jobs.
//!
//! Each job runs in its own session; a failing job never cancels or delays
//! the report of any other.

use std::fmt;
use std::str::FromStr;

use futures_util::future::join_all;
use serde::{Serialize, Serializer};
use tracing::{info, instrument, warn};
use url::Url;

use super::{Connector, DownloadError, Downloader, FailureKind, Style};

/// The built-in job list: `(host, path, output_name)`.
///
/// The second entry is deliberately unresolvable.
pub const DEFAULT_JOBS: [(&str, &str, &str); 3] = [
    (
        "www.cs.ubbcluj.ro",
        "/~rlupsa/edu/pdp/",
        "PDP_Assignment_Page.html",
    ),
    ("invalid.host.12345", "/", "INVALID_HOST.txt"),
    ("httpbin.org", "/html", "HTTPBIN_TestPage.html"),
];

/// Errors from parsing a job specification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JobParseError {
    /// No `=name` suffix.
    #[error("job {spec:?} has no output name (expected HOST/PATH=NAME)")]
    MissingName {
        /// The rejected specification.
        spec: String,
    },

    /// The output name is empty or would escape the output directory.
    #[error("invalid output name {name:?}: must be a plain file name")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// No host before the path.
    #[error("job {spec:?} has no host")]
    MissingHost {
        /// The rejected specification.
        spec: String,
    },

    /// The `http://` form did not parse.
    #[error("invalid URL {spec:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// One download and where its body should be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadJob {
    /// Host to connect to.
    pub host: String,
    /// Request path.
    pub path: String,
    /// File name for the body, relative to the output directory.
    pub output_name: String,
}

impl DownloadJob {
    /// Creates a job.
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            output_name: output_name.into(),
        }
    }

    /// Returns the built-in jobs.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_JOBS
            .iter()
            .map(|(host, path, name)| Self::new(*host, *path, *name))
            .collect()
    }
}

impl fmt::Display for DownloadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}={}", self.host, self.path, self.output_name)
    }
}

/// Parses `HOST[/PATH]=NAME` or `http://HOST[/PATH]=NAME`.
///
/// The name is taken after the last `=`, so paths may carry query strings.
/// A missing path means `/`.
impl FromStr for DownloadJob {
    type Err = JobParseError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        let Some((location, name)) = spec.rsplit_once('=') else {
            return Err(JobParseError::MissingName {
                spec: spec.to_string(),
            });
        };
        let name = name.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(JobParseError::InvalidName {
                name: name.to_string(),
            });
        }

        let (host, path) = if location.contains("://") {
            parse_url(location)?
        } else {
            match location.find('/') {
                Some(slash) => (
                    location[..slash].to_string(),
                    location[slash..].to_string(),
                ),
                None => (location.to_string(), "/".to_string()),
            }
        };
        if host.is_empty() {
            return Err(JobParseError::MissingHost {
                spec: spec.to_string(),
            });
        }

        Ok(Self::new(host, path, name))
    }
}

fn parse_url(location: &str) -> Result<(String, String), JobParseError> {
    let invalid = |reason: &str| JobParseError::InvalidUrl {
        spec: location.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(location).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid("only http:// is supported"));
    }
    if url.port().is_some() {
        return Err(invalid("ports are set with --port, not per job"));
    }
    let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    Ok((host.to_string(), path))
}

/// The result of one job.
#[derive(Debug)]
pub struct JobOutcome {
    /// The job that ran.
    pub job: DownloadJob,
    /// Its body, or why it failed.
    pub result: Result<Vec<u8>, DownloadError>,
}

impl JobOutcome {
    /// Returns true when the body was downloaded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Flat JSON form of an outcome: the job's fields followed by its result.
#[derive(Serialize)]
struct OutcomeRecord<'a> {
    #[serde(flatten)]
    job: &'a DownloadJob,
    success: bool,
    bytes: Option<usize>,
    error_kind: Option<FailureKind>,
    error: Option<String>,
}

impl Serialize for JobOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = match &self.result {
            Ok(body) => OutcomeRecord {
                job: &self.job,
                success: true,
                bytes: Some(body.len()),
                error_kind: None,
                error: None,
            },
            Err(e) => OutcomeRecord {
                job: &self.job,
                success: false,
                bytes: None,
                error_kind: Some(e.kind()),
                error: Some(e.to_string()),
            },
        };
        record.serialize(serializer)
    }
}

/// Outcomes of a batch, in job order.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    style: Style,
    outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    /// Returns the style the batch ran with.
    #[must_use]
    pub fn style(&self) -> Style {
        self.style
    }

    /// Returns every outcome, in job order.
    #[must_use]
    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    /// Consumes the report, returning the outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<JobOutcome> {
        self.outcomes
    }

    /// Returns the number of jobs that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Returns the number of jobs that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Runs every job concurrently and waits for all of them.
///
/// Failures are recorded in the report; they never stop the batch.
#[instrument(skip_all, fields(style = %downloader.style(), jobs = jobs.len()))]
pub async fn run_batch<C: Connector>(
    downloader: &Downloader<C>,
    jobs: Vec<DownloadJob>,
) -> BatchReport {
    let downloads = jobs
        .iter()
        .map(|job| downloader.download(&job.host, &job.path));
    let results = join_all(downloads).await;

    let outcomes: Vec<JobOutcome> = jobs
        .into_iter()
        .zip(results)
        .map(|(job, result)| {
            match &result {
                Ok(body) => info!(job = %job, bytes = body.len(), "download succeeded"),
                Err(e) => warn!(job = %job, kind = e.kind().as_str(), error = %e, "download failed"),
            }
            JobOutcome { job, result }
        })
        .collect();

    BatchReport {
        style: downloader.style(),
        outcomes,
    }
}
