use crate::{CandidateFile, HealthState, JobStatus, MetricValue, Phase, Severity, StepState};

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub phase: Phase,
    pub health: HealthState,
    pub selected_file: Option<CandidateFile>,
    pub processing_visible: bool,
    pub status_text: String,
    pub progress_percent: u8,
    pub steps: [StepState; 3],
    pub results_visible: bool,
    pub job_id: Option<String>,
    pub stems: Vec<StemCard>,
    pub metrics: Vec<MetricCard>,
    pub history: Vec<HistoryRow>,
    /// False until the first listing arrived.
    pub history_loaded: bool,
    pub history_pending: u32,
    pub transfers_pending: u32,
    pub notifications: Vec<NotificationView>,
    pub dirty: bool,
}

/// Closed set of stem names with a dedicated look; anything else is `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemKind {
    Vocals,
    Drums,
    Bass,
    Other,
    Custom,
}

impl StemKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "vocals" => StemKind::Vocals,
            "drums" => StemKind::Drums,
            "bass" => StemKind::Bass,
            "other" => StemKind::Other,
            _ => StemKind::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemCard {
    pub name: String,
    pub kind: StemKind,
    pub download_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCard {
    pub name: String,
    /// Numbers carry three decimals; anything else is shown as sent.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub job_id: String,
    pub short_id: String,
    pub filename: String,
    pub status: JobStatus,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
}

pub(crate) fn format_metric(value: &MetricValue) -> String {
    match value {
        MetricValue::Number(number) => format!("{number:.3}"),
        MetricValue::Text(text) => text.clone(),
    }
}

pub(crate) fn short_job_id(job_id: &str) -> String {
    let prefix: String = job_id.chars().take(8).collect();
    format!("{prefix}...")
}
