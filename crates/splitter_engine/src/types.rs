use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

pub type JobId = String;

/// Job status as the separation API spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// `POST /upload` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub job_id: JobId,
    #[serde(default)]
    pub filename: Option<String>,
}

/// `GET /status/{job_id}` reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    pub status: WireStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub stems: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "flatten_metrics")]
    pub quality_metrics: BTreeMap<String, MetricReading>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One quality metric leaf. Nested objects are flattened to `outer.inner` names.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricReading {
    Number(f64),
    Text(String),
}

fn flatten_metrics<'de, D>(deserializer: D) -> Result<BTreeMap<String, MetricReading>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut metrics = BTreeMap::new();
    for (name, value) in raw {
        flatten_metric(&mut metrics, name, value);
    }
    Ok(metrics)
}

fn flatten_metric(metrics: &mut BTreeMap<String, MetricReading>, name: String, value: Value) {
    let reading = match value {
        Value::Object(fields) => {
            for (field, inner) in fields {
                flatten_metric(metrics, format!("{name}.{field}"), inner);
            }
            return;
        }
        Value::Number(number) => match number.as_f64() {
            Some(x) => MetricReading::Number(x),
            None => MetricReading::Text(number.to_string()),
        },
        Value::String(text) => MetricReading::Text(text),
        other => MetricReading::Text(other.to_string()),
    };
    metrics.insert(name, reading);
}

/// One entry of `GET /jobs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    #[serde(default)]
    pub filename: Option<String>,
    pub status: WireStatus,
    #[serde(default)]
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct JobsResponse {
    pub jobs: Vec<JobRecord>,
}

/// `GET /health` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub device: String,
}

/// Body of any non-2xx reply.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    UploadFinished(Result<UploadReceipt, ApiError>),
    SeparationStarted {
        job_id: JobId,
        result: Result<(), ApiError>,
    },
    StatusFetched {
        job_id: JobId,
        seq: u64,
        result: Result<StatusResponse, ApiError>,
    },
    JobsFetched(Result<Vec<JobRecord>, ApiError>),
    HealthChecked(Result<HealthResponse, ApiError>),
    StemDownloaded {
        stem: String,
        result: Result<PathBuf, ApiError>,
    },
    PlaybackFinished {
        stem: String,
        result: Result<(), ApiError>,
    },
    /// The poll timer fired.
    PollDue,
    /// A notification's display time is over.
    NotificationDue(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    Io,
    Playback,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Playback => write!(f, "playback error"),
        }
    }
}
