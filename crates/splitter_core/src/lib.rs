//! Stem splitter core: pure job-lifecycle state machine and view-model helpers.
mod effect;
mod job;
mod msg;
mod state;
mod update;
mod upload;
mod view_model;

pub use effect::Effect;
pub use job::{
    percent_from_fraction, stem_download_path, Failure, HealthReport, JobId, JobStatus,
    JobSummary, MetricValue, StatusReport,
};
pub use msg::Msg;
pub use state::{
    stage_for_percent, steps_for, AppState, HealthState, Phase, Session, Severity, Stage,
    StepState, NOTIFICATION_TTL, POLL_INTERVAL,
};
pub use update::update;
pub use upload::{
    validate_candidate, CandidateFile, ValidationError, ACCEPTED_EXTENSIONS, MAX_UPLOAD_BYTES,
};
pub use view_model::{
    AppViewModel, HistoryRow, MetricCard, NotificationView, StemCard, StemKind,
};
