use std::collections::BTreeMap;
use std::fmt;

/// Server-issued job identifier.
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    /// Any status string the client does not recognise.
    Unknown,
}

impl JobStatus {
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

/// One `/status/{job_id}` reply, already decoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    pub status: Option<JobStatus>,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub stems: BTreeMap<String, String>,
    pub quality_metrics: BTreeMap<String, MetricValue>,
    pub error: Option<String>,
}

impl StatusReport {
    pub fn status(&self) -> JobStatus {
        self.status.unwrap_or(JobStatus::Unknown)
    }
}

/// A quality metric as reported; only numbers get fixed-precision formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// One entry of the `/jobs` listing.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub job_id: JobId,
    pub filename: Option<String>,
    pub status: JobStatus,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub status: String,
    pub device: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Why a network-backed step did not succeed, as seen by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The request never produced an HTTP response (or the body was unusable).
    Transport(String),
    /// Non-2xx reply; `message` is the server's `error` field when present.
    Api { status: u16, message: String },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Transport(message) => write!(f, "{message}"),
            Failure::Api { message, .. } => write!(f, "{message}"),
        }
    }
}

/// Converts a `[0, 1]` progress fraction to a whole percentage.
pub fn percent_from_fraction(progress: f64) -> u8 {
    if !progress.is_finite() {
        return 0;
    }
    (progress * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Relative API path serving a stem, for playback and download alike.
pub fn stem_download_path(job_id: &str, stem: &str) -> String {
    format!("/download/{job_id}/{stem}")
}
