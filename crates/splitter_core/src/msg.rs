use crate::{CandidateFile, Failure, HealthReport, JobId, JobSummary, StatusReport};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The client came up; kicks off the health check and history load.
    Started,
    /// User picked a local file (not yet uploaded).
    FileSelected(CandidateFile),
    /// User asked to upload the selected file.
    SubmitClicked,
    /// Upload finished with the server-issued job id.
    UploadFinished(Result<JobId, Failure>),
    /// The separate-start request for `job_id` finished.
    SeparationStarted {
        job_id: JobId,
        result: Result<(), Failure>,
    },
    /// Poll timer fired.
    PollTick,
    /// A status reply for the poll issued with `seq`.
    StatusReceived {
        job_id: JobId,
        seq: u64,
        result: Result<StatusReport, Failure>,
    },
    /// User asked for a history refresh.
    HistoryRequested,
    HistoryLoaded(Result<Vec<JobSummary>, Failure>),
    /// User asked whether the API is reachable.
    HealthRequested,
    HealthChecked(Result<HealthReport, Failure>),
    PlayStemClicked { job_id: JobId, stem: String },
    PlaybackFinished {
        stem: String,
        result: Result<(), Failure>,
    },
    DownloadStemClicked { job_id: JobId, stem: String },
    /// Download outcome; `Ok` carries the saved path for display.
    DownloadFinished {
        stem: String,
        result: Result<String, Failure>,
    },
    NotificationExpired(u64),
    /// User dismissed the current result and wants a clean slate.
    ResetClicked,
    /// Render tick to coalesce rendering.
    Tick,
}
