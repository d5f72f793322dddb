use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use splitter_core::{
    update, AppState, CandidateFile, Effect, HealthState, Msg, Phase, Severity,
};
use splitter_logging::{splitter_debug, splitter_info};

use crate::effects::EffectRunner;
use crate::ui::printer::FramePrinter;
use crate::ui::render::{render, RenderOptions};

/// How long to wait for an engine event before ticking.
const EVENT_WAIT: Duration = Duration::from_millis(75);

/// What a single invocation is trying to achieve; decides when the loop ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goal {
    Separate(CandidateFile),
    History,
    Health,
    Download { job_id: String, stem: String },
    Play { job_id: String, stem: String },
}

impl Goal {
    fn initial_messages(&self) -> Vec<Msg> {
        match self {
            Goal::Separate(file) => vec![
                Msg::Started,
                Msg::FileSelected(file.clone()),
                Msg::SubmitClicked,
            ],
            Goal::History => vec![Msg::HistoryRequested],
            Goal::Health => vec![Msg::HealthRequested],
            Goal::Download { job_id, stem } => vec![Msg::DownloadStemClicked {
                job_id: job_id.clone(),
                stem: stem.clone(),
            }],
            Goal::Play { job_id, stem } => vec![Msg::PlayStemClicked {
                job_id: job_id.clone(),
                stem: stem.clone(),
            }],
        }
    }

    /// `Some(success)` once nothing more can happen for this goal.
    fn outcome(&self, state: &AppState) -> Option<bool> {
        let view = state.view();
        match self {
            Goal::Separate(_) => match state.phase() {
                Phase::Completed if view.history_pending == 0 => Some(true),
                Phase::Failed | Phase::Idle => Some(false),
                Phase::Uploaded if state.session().is_some_and(|s| s.halted) => Some(false),
                _ => None,
            },
            Goal::History => (view.history_pending == 0).then_some(view.history_loaded),
            Goal::Health => match view.health {
                HealthState::Unknown => None,
                HealthState::Online { .. } => Some(true),
                HealthState::Offline { .. } => Some(false),
            },
            Goal::Download { .. } | Goal::Play { .. } => (view.transfers_pending == 0).then(|| {
                !view
                    .notifications
                    .iter()
                    .any(|n| n.severity == Severity::Error)
            }),
        }
    }
}

/// Builds the upload candidate from what the filesystem reports.
pub fn candidate_from_path(path: &Path) -> anyhow::Result<CandidateFile> {
    let metadata =
        fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("{} is not a file", path.display());
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(CandidateFile {
        path: path.to_path_buf(),
        file_name,
        size_bytes: metadata.len(),
    })
}

pub struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    printer: FramePrinter<W>,
    options: RenderOptions,
}

impl<W: Write> App<W> {
    pub fn new(runner: EffectRunner, out: W, options: RenderOptions) -> Self {
        Self {
            state: AppState::new(),
            runner,
            printer: FramePrinter::new(out),
            options,
        }
    }

    /// Drives the reducer until `goal` settles; returns whether it succeeded.
    pub fn run(&mut self, goal: &Goal) -> io::Result<bool> {
        splitter_info!("Running {:?}", goal);
        for msg in goal.initial_messages() {
            self.dispatch(msg)?;
        }
        loop {
            if let Some(success) = goal.outcome(&self.state) {
                splitter_debug!("goal settled, success={}", success);
                if self.state.is_polling() {
                    self.runner.enqueue(vec![Effect::StopPolling]);
                }
                return Ok(success);
            }
            let msg = self.runner.next_msg(EVENT_WAIT).unwrap_or(Msg::Tick);
            self.dispatch(msg)?;
        }
    }

    fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.enqueue(effects);
        if state.consume_dirty() {
            self.printer.print(render(&state.view(), &self.options))?;
        }
        self.state = state;
        Ok(())
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.printer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use splitter_engine::{
        ApiError, EngineHandle, FailureKind, HealthResponse, JobRecord, MetricReading,
        SeparationApi, StatusResponse, UploadReceipt, WireStatus,
    };
    use url::Url;

    use super::*;

    /// Scripted API: status replies are served in order, the last one repeats.
    struct ScriptedApi {
        statuses: Mutex<VecDeque<StatusResponse>>,
        healthy: bool,
    }

    impl ScriptedApi {
        fn new(statuses: Vec<StatusResponse>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                healthy: true,
            }
        }
    }

    #[async_trait::async_trait]
    impl SeparationApi for ScriptedApi {
        async fn upload(&self, _path: &Path, file_name: &str) -> Result<UploadReceipt, ApiError> {
            Ok(UploadReceipt {
                job_id: "job-42".to_string(),
                filename: Some(file_name.to_string()),
            })
        }

        async fn start_separation(&self, _job_id: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn status(&self, _job_id: &str) -> Result<StatusResponse, ApiError> {
            let mut statuses = self.statuses.lock().unwrap();
            let next = if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            };
            next.ok_or(ApiError {
                kind: FailureKind::HttpStatus(404),
                message: "Job not found".to_string(),
            })
        }

        async fn jobs(&self) -> Result<Vec<JobRecord>, ApiError> {
            Ok(vec![JobRecord {
                job_id: "job-42".to_string(),
                filename: Some("song.mp3".to_string()),
                status: WireStatus::Completed,
                progress: 1.0,
            }])
        }

        async fn health(&self) -> Result<HealthResponse, ApiError> {
            if self.healthy {
                Ok(HealthResponse {
                    status: "healthy".to_string(),
                    device: "cpu".to_string(),
                })
            } else {
                Err(ApiError {
                    kind: FailureKind::Network,
                    message: "connection refused".to_string(),
                })
            }
        }

        async fn download(&self, _job_id: &str, _stem: &str) -> Result<Bytes, ApiError> {
            Ok(Bytes::from_static(b"RIFF"))
        }

        fn stem_url(&self, job_id: &str, stem: &str) -> Result<Url, ApiError> {
            Url::parse(&format!("http://api.test/download/{job_id}/{stem}")).map_err(|err| {
                ApiError {
                    kind: FailureKind::InvalidUrl,
                    message: err.to_string(),
                }
            })
        }
    }

    fn status(status: WireStatus, progress: f64) -> StatusResponse {
        StatusResponse {
            status,
            progress,
            stems: BTreeMap::new(),
            quality_metrics: BTreeMap::new(),
            error: None,
        }
    }

    fn app_with(api: ScriptedApi, dir: &Path) -> App<Vec<u8>> {
        splitter_logging::initialize_for_tests();
        let engine = EngineHandle::with_api(Arc::new(api), dir.to_path_buf(), &[]).unwrap();
        App::new(
            EffectRunner::new(engine),
            Vec::new(),
            RenderOptions {
                api_base_url: "http://api.test".to_string(),
            },
        )
    }

    fn audio_file(dir: &Path) -> CandidateFile {
        let path = dir.join("song.mp3");
        fs::write(&path, b"ID3 fake audio").unwrap();
        candidate_from_path(&path).unwrap()
    }

    #[test]
    fn separate_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let mut done = status(WireStatus::Completed, 1.0);
        done.stems.insert("vocals".to_string(), "/srv/vocals.wav".to_string());
        done.quality_metrics.insert(
            "vocals.energy_ratio".to_string(),
            MetricReading::Number(0.4),
        );
        let mut app = app_with(ScriptedApi::new(vec![done]), dir.path());

        let goal = Goal::Separate(audio_file(dir.path()));
        assert!(app.run(&goal).unwrap());
        assert!(!app.state.is_polling());

        let text = String::from_utf8(app.into_output()).unwrap();
        assert!(text.contains("File: song.mp3 (14 Bytes)"));
        assert!(text.contains("Processing completed successfully!"));
        assert!(text.contains("http://api.test/download/job-42/vocals"));
        assert!(text.contains("vocals.energy_ratio: 0.400"));
        assert!(text.contains("job-42... song.mp3"));
    }

    #[test]
    fn failed_job_ends_unsuccessfully() {
        let dir = tempfile::tempdir().unwrap();
        let mut failed = status(WireStatus::Failed, 0.4);
        failed.error = Some("decode error".to_string());
        let mut app = app_with(ScriptedApi::new(vec![failed]), dir.path());

        let goal = Goal::Separate(audio_file(dir.path()));
        assert!(!app.run(&goal).unwrap());

        let text = String::from_utf8(app.into_output()).unwrap();
        assert!(text.contains("[!] Processing failed: decode error"));
        assert!(!text.contains("Stems:"));
    }

    #[test]
    fn rejected_file_never_reaches_the_api() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"not audio").unwrap();
        let mut app = app_with(ScriptedApi::new(Vec::new()), dir.path());

        let goal = Goal::Separate(candidate_from_path(&path).unwrap());
        assert!(!app.run(&goal).unwrap());
        let text = String::from_utf8(app.into_output()).unwrap();
        assert!(!text.contains("Uploading..."));
    }

    #[test]
    fn offline_health_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = ScriptedApi::new(Vec::new());
        api.healthy = false;
        let mut app = app_with(api, dir.path());

        assert!(!app.run(&Goal::Health).unwrap());
        let text = String::from_utf8(app.into_output()).unwrap();
        assert!(text.contains("API offline: connection refused"));
    }

    #[test]
    fn download_saves_into_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(ScriptedApi::new(Vec::new()), dir.path());

        let goal = Goal::Download {
            job_id: "job-42".to_string(),
            stem: "bass".to_string(),
        };
        assert!(app.run(&goal).unwrap());
        assert_eq!(fs::read(dir.path().join("bass.wav")).unwrap(), b"RIFF");
    }

    #[test]
    fn playback_without_player_reports_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(ScriptedApi::new(Vec::new()), dir.path());

        let goal = Goal::Play {
            job_id: "job-42".to_string(),
            stem: "drums".to_string(),
        };
        assert!(!app.run(&goal).unwrap());
        let text = String::from_utf8(app.into_output()).unwrap();
        assert!(text.contains("Failed to play drums: no audio player configured"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(candidate_from_path(&dir.path().join("gone.mp3")).is_err());
        assert!(candidate_from_path(dir.path()).is_err());
    }
}
