use std::collections::BTreeMap;
use std::time::Duration;

use crate::job::{percent_from_fraction, stem_download_path};
use crate::view_model::{
    format_metric, short_job_id, AppViewModel, HistoryRow, MetricCard, NotificationView,
    StemCard, StemKind,
};
use crate::{CandidateFile, Effect, JobId, JobSummary, MetricValue, StatusReport};

/// Fixed status poll period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Lifecycle of the single tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    /// Upload accepted; separation start requested (or rejected, see `halted`).
    Uploaded,
    /// Separation started; waiting for the first poll tick.
    Separating,
    Polling,
    Completed,
    Failed,
}

impl Phase {
    /// True while a new upload must not be started.
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Uploading)
    }
}

/// Cosmetic processing step, derived from progress thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Upload,
    Separate,
    Analyze,
}

impl Stage {
    fn index(self) -> usize {
        match self {
            Stage::Upload => 0,
            Stage::Separate => 1,
            Stage::Analyze => 2,
        }
    }
}

/// `<= 20` upload, `< 80` separation, anything above analysis.
pub fn stage_for_percent(percent: u8) -> Stage {
    if percent <= 20 {
        Stage::Upload
    } else if percent < 80 {
        Stage::Separate
    } else {
        Stage::Analyze
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
    #[default]
    Pending,
    Active,
    Done,
}

/// Colours the three step indicators for the given stage.
pub fn steps_for(stage: Stage, finished: bool) -> [StepState; 3] {
    if finished {
        return [StepState::Done; 3];
    }
    let active = stage.index();
    let mut steps = [StepState::Pending; 3];
    for (i, step) in steps.iter_mut().enumerate() {
        *step = match i.cmp(&active) {
            std::cmp::Ordering::Less => StepState::Done,
            std::cmp::Ordering::Equal => StepState::Active,
            std::cmp::Ordering::Greater => StepState::Pending,
        };
    }
    steps
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HealthState {
    #[default]
    Unknown,
    Online { device: String },
    Offline { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StatusLine {
    #[default]
    Empty,
    Uploading,
    Uploaded,
    StartingSeparation,
    Separating,
    Analyzing,
    Completed,
}

impl StatusLine {
    fn text(self) -> &'static str {
        match self {
            StatusLine::Empty => "",
            StatusLine::Uploading => "Uploading...",
            StatusLine::Uploaded => "File uploaded successfully",
            StatusLine::StartingSeparation => "Starting separation...",
            StatusLine::Separating => "Separating audio tracks...",
            StatusLine::Analyzing => "Analyzing quality metrics...",
            StatusLine::Completed => "Processing completed successfully!",
        }
    }
}

/// The one job the controller is tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub job_id: Option<JobId>,
    pub file_name: String,
    /// Set when the separate-start request failed; nothing drives the job anymore.
    pub halted: bool,
    pub last_applied_seq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct JobResults {
    stems: BTreeMap<String, String>,
    quality_metrics: BTreeMap<String, MetricValue>,
}

#[derive(Debug, Clone, PartialEq)]
struct Notification {
    id: u64,
    severity: Severity,
    message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    phase: Phase,
    health: HealthState,
    selected: Option<CandidateFile>,
    session: Option<Session>,
    timer_active: bool,
    next_poll_seq: u64,
    progress_percent: u8,
    stage: Stage,
    status_line: StatusLine,
    results: Option<JobResults>,
    history: Vec<JobSummary>,
    history_loaded: bool,
    history_pending: u32,
    transfers_pending: u32,
    notifications: Vec<Notification>,
    next_notification_id: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_job_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.job_id.as_deref())
    }

    pub fn selected_file(&self) -> Option<&CandidateFile> {
        self.selected.as_ref()
    }

    /// True while a poll timer is expected to be running.
    pub fn is_polling(&self) -> bool {
        self.timer_active
    }

    pub fn view(&self) -> AppViewModel {
        let finished = self.phase == Phase::Completed;
        let processing_visible = matches!(
            self.phase,
            Phase::Uploading
                | Phase::Uploaded
                | Phase::Separating
                | Phase::Polling
                | Phase::Completed
        );
        let (stems, metrics) = match (&self.results, self.current_job_id()) {
            (Some(results), Some(job_id)) => (
                results
                    .stems
                    .keys()
                    .map(|name| StemCard {
                        name: name.clone(),
                        kind: StemKind::from_name(name),
                        download_path: stem_download_path(job_id, name),
                    })
                    .collect(),
                results
                    .quality_metrics
                    .iter()
                    .map(|(name, value)| MetricCard {
                        name: name.clone(),
                        value: format_metric(value),
                    })
                    .collect(),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        AppViewModel {
            phase: self.phase,
            health: self.health.clone(),
            selected_file: self.selected.clone(),
            processing_visible,
            status_text: self.status_line.text().to_string(),
            progress_percent: self.progress_percent,
            steps: if processing_visible {
                steps_for(self.stage, finished)
            } else {
                [StepState::Pending; 3]
            },
            results_visible: finished && self.results.is_some(),
            job_id: self.current_job_id().map(ToOwned::to_owned),
            stems,
            metrics,
            history: self
                .history
                .iter()
                .map(|job| HistoryRow {
                    job_id: job.job_id.clone(),
                    short_id: short_job_id(&job.job_id),
                    filename: job
                        .filename
                        .clone()
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| "Unknown file".to_string()),
                    status: job.status,
                    percent: percent_from_fraction(job.progress),
                })
                .collect(),
            history_loaded: self.history_loaded,
            history_pending: self.history_pending,
            transfers_pending: self.transfers_pending,
            notifications: self
                .notifications
                .iter()
                .map(|n| NotificationView {
                    id: n.id,
                    severity: n.severity,
                    message: n.message.clone(),
                })
                .collect(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything visible changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_health(&mut self, health: HealthState) {
        self.health = health;
        self.mark_dirty();
    }

    pub(crate) fn select_file(&mut self, file: CandidateFile) {
        self.selected = Some(file);
        self.mark_dirty();
    }

    /// Drops any previous session and starts tracking a new upload.
    ///
    /// Returns `true` when a poll timer was running and must be stopped.
    pub(crate) fn begin_upload(&mut self, file_name: String) -> bool {
        let had_timer = std::mem::take(&mut self.timer_active);
        self.session = Some(Session {
            job_id: None,
            file_name,
            halted: false,
            last_applied_seq: None,
        });
        self.phase = Phase::Uploading;
        self.results = None;
        self.progress_percent = 0;
        self.stage = Stage::Upload;
        self.status_line = StatusLine::Uploading;
        self.mark_dirty();
        had_timer
    }

    pub(crate) fn upload_accepted(&mut self, job_id: JobId) {
        if let Some(session) = self.session.as_mut() {
            session.job_id = Some(job_id);
        }
        self.phase = Phase::Uploaded;
        self.progress_percent = 10;
        self.stage = Stage::Upload;
        self.status_line = StatusLine::Uploaded;
        self.mark_dirty();
    }

    pub(crate) fn upload_rejected(&mut self) {
        self.session = None;
        self.phase = Phase::Idle;
        self.progress_percent = 0;
        self.status_line = StatusLine::Empty;
        self.mark_dirty();
    }

    pub(crate) fn separation_started(&mut self) {
        self.phase = Phase::Separating;
        self.timer_active = true;
        self.progress_percent = 20;
        self.stage = Stage::Separate;
        self.status_line = StatusLine::StartingSeparation;
        self.mark_dirty();
    }

    pub(crate) fn separation_rejected(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.halted = true;
        }
        self.mark_dirty();
    }

    /// Allocates the sequence number for the next status request.
    pub(crate) fn next_poll(&mut self) -> u64 {
        self.next_poll_seq += 1;
        if self.phase == Phase::Separating {
            self.phase = Phase::Polling;
        }
        self.next_poll_seq
    }

    /// True if a reply for `job_id` with `seq` is newer than anything applied.
    pub(crate) fn accepts_status(&self, job_id: &str, seq: u64) -> bool {
        if !matches!(self.phase, Phase::Separating | Phase::Polling) {
            return false;
        }
        match self.session.as_ref() {
            Some(session) => {
                session.job_id.as_deref() == Some(job_id)
                    && session.last_applied_seq.is_none_or(|last| seq > last)
            }
            None => false,
        }
    }

    pub(crate) fn record_applied(&mut self, seq: u64) {
        if let Some(session) = self.session.as_mut() {
            session.last_applied_seq = Some(seq);
        }
    }

    pub(crate) fn apply_progress(&mut self, report: &StatusReport, rederive_stage: bool) {
        let percent = percent_from_fraction(report.progress);
        self.progress_percent = percent;
        if rederive_stage {
            let stage = stage_for_percent(percent);
            self.stage = stage;
            self.status_line = match stage {
                // Below the threshold the label keeps whatever the last step set.
                Stage::Upload => self.status_line,
                Stage::Separate => StatusLine::Separating,
                Stage::Analyze => StatusLine::Analyzing,
            };
        }
        self.mark_dirty();
    }

    pub(crate) fn complete(&mut self, report: StatusReport) {
        self.timer_active = false;
        self.phase = Phase::Completed;
        self.progress_percent = 100;
        self.stage = Stage::Analyze;
        self.status_line = StatusLine::Completed;
        self.results = Some(JobResults {
            stems: report.stems,
            quality_metrics: report.quality_metrics,
        });
        self.mark_dirty();
    }

    /// Terminal failure: back to an idle-looking screen with no job handle.
    pub(crate) fn fail(&mut self) {
        self.timer_active = false;
        self.phase = Phase::Failed;
        self.reset_job_view();
    }

    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.reset_job_view();
    }

    fn reset_job_view(&mut self) {
        self.session = None;
        self.selected = None;
        self.results = None;
        self.progress_percent = 0;
        self.stage = Stage::Upload;
        self.status_line = StatusLine::Empty;
        self.mark_dirty();
    }

    /// Stores a fresh history listing, newest first.
    pub(crate) fn set_history(&mut self, mut jobs: Vec<JobSummary>) {
        jobs.reverse();
        self.history = jobs;
        self.history_loaded = true;
        self.mark_dirty();
    }

    pub(crate) fn history_requested(&mut self) {
        self.history_pending += 1;
    }

    pub(crate) fn history_settled(&mut self) {
        self.history_pending = self.history_pending.saturating_sub(1);
        self.mark_dirty();
    }

    pub(crate) fn transfer_started(&mut self) {
        self.transfers_pending += 1;
        self.mark_dirty();
    }

    pub(crate) fn transfer_settled(&mut self) {
        self.transfers_pending = self.transfers_pending.saturating_sub(1);
        self.mark_dirty();
    }

    /// Adds a notification and returns the effect that will dismiss it.
    pub(crate) fn notify(&mut self, severity: Severity, message: impl Into<String>) -> Effect {
        self.next_notification_id += 1;
        let id = self.next_notification_id;
        self.notifications.push(Notification {
            id,
            severity,
            message: message.into(),
        });
        self.mark_dirty();
        Effect::ScheduleDismiss {
            id,
            after: NOTIFICATION_TTL,
        }
    }

    pub(crate) fn dismiss(&mut self, id: u64) {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        if self.notifications.len() != before {
            self.mark_dirty();
        }
    }
}
