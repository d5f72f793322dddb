use std::path::PathBuf;
use std::time::Duration;

use crate::JobId;

/// Side effects requested by [`crate::update`]; executed outside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckHealth,
    FetchHistory,
    Upload { path: PathBuf, file_name: String },
    StartSeparation { job_id: JobId },
    /// Replace any running poll timer with one firing every `interval`.
    StartPolling { interval: Duration },
    StopPolling,
    FetchStatus { job_id: JobId, seq: u64 },
    PlayStem { job_id: JobId, stem: String },
    DownloadStem {
        job_id: JobId,
        stem: String,
        file_name: String,
    },
    ScheduleDismiss { id: u64, after: Duration },
}
