use splitter_core::{
    AppViewModel, HealthState, JobStatus, Severity, StemKind, StepState,
};

const PROGRESS_BAR_WIDTH: usize = 30;
const STEP_LABELS: [&str; 3] = ["Upload", "Separate", "Analyze"];

/// Screen region that is printed again only when its content changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Health,
    File,
    Progress,
    Results,
    History,
    Notification(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub lines: Vec<String>,
}

/// Base URL stem links are resolved against.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub api_base_url: String,
}

pub fn render(view: &AppViewModel, options: &RenderOptions) -> Vec<Block> {
    let mut blocks = Vec::new();

    if let Some(lines) = health_lines(&view.health) {
        blocks.push(Block {
            kind: BlockKind::Health,
            lines,
        });
    }

    if let Some(file) = &view.selected_file {
        blocks.push(Block {
            kind: BlockKind::File,
            lines: vec![format!(
                "File: {} ({})",
                file.file_name,
                format_file_size(file.size_bytes)
            )],
        });
    }

    if view.processing_visible {
        blocks.push(Block {
            kind: BlockKind::Progress,
            lines: progress_lines(view),
        });
    }

    if view.results_visible {
        blocks.push(Block {
            kind: BlockKind::Results,
            lines: result_lines(view, options),
        });
    }

    if view.history_loaded {
        blocks.push(Block {
            kind: BlockKind::History,
            lines: history_lines(view),
        });
    }

    for notification in &view.notifications {
        let marker = match notification.severity {
            Severity::Info => "i",
            Severity::Success => "+",
            Severity::Error => "!",
        };
        blocks.push(Block {
            kind: BlockKind::Notification(notification.id),
            lines: vec![format!("[{marker}] {}", notification.message)],
        });
    }

    blocks
}

fn health_lines(health: &HealthState) -> Option<Vec<String>> {
    match health {
        HealthState::Unknown => None,
        HealthState::Online { device } if device.is_empty() => {
            Some(vec!["API online".to_string()])
        }
        HealthState::Online { device } => Some(vec![format!("API online ({device})")]),
        HealthState::Offline { reason } => Some(vec![format!("API offline: {reason}")]),
    }
}

fn progress_lines(view: &AppViewModel) -> Vec<String> {
    let percent = usize::from(view.progress_percent.min(100));
    let filled = percent * PROGRESS_BAR_WIDTH / 100;
    let bar = format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled),
        percent
    );
    let steps = STEP_LABELS
        .iter()
        .zip(view.steps.iter())
        .map(|(label, step)| {
            let mark = match step {
                StepState::Pending => " ",
                StepState::Active => ">",
                StepState::Done => "x",
            };
            format!("[{mark}] {label}")
        })
        .collect::<Vec<_>>()
        .join("  ");

    let mut lines = vec![bar, steps];
    if !view.status_text.is_empty() {
        lines.push(view.status_text.clone());
    }
    lines
}

fn result_lines(view: &AppViewModel, options: &RenderOptions) -> Vec<String> {
    let base = options.api_base_url.trim_end_matches('/');
    let mut lines = Vec::new();

    if let Some(job_id) = &view.job_id {
        lines.push(format!("Job {job_id}"));
    }
    lines.push("Stems:".to_string());
    for stem in &view.stems {
        lines.push(format!(
            "  {} {:<8} {}{}",
            stem_icon(stem.kind),
            stem.name,
            base,
            stem.download_path
        ));
    }

    if !view.metrics.is_empty() {
        lines.push("Quality metrics:".to_string());
        for metric in &view.metrics {
            lines.push(format!("  {}: {}", metric.name, metric.value));
        }
    }
    lines
}

fn history_lines(view: &AppViewModel) -> Vec<String> {
    if view.history.is_empty() {
        return vec!["No processing history yet".to_string()];
    }
    let mut lines = vec!["History:".to_string()];
    lines.extend(view.history.iter().map(|row| {
        format!(
            "  {} {} {}  {} ({}%)",
            status_icon(row.status),
            row.short_id,
            row.filename,
            row.status.label(),
            row.percent
        )
    }));
    lines
}

fn stem_icon(kind: StemKind) -> &'static str {
    match kind {
        StemKind::Vocals => "🎤",
        StemKind::Drums => "🥁",
        StemKind::Bass => "🎸",
        StemKind::Other => "🎹",
        StemKind::Custom => "🎵",
    }
}

fn status_icon(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Uploaded => "⬆",
        JobStatus::Processing => "⏳",
        JobStatus::Completed => "✔",
        JobStatus::Failed => "✖",
        JobStatus::Unknown => "?",
    }
}

/// Human readable size with at most two decimals, e.g. `1.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
