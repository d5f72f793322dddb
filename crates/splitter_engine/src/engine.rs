use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use splitter_logging::{splitter_debug, splitter_info, splitter_warn};
use thiserror::Error;

use crate::api::{ApiSettings, ReqwestApi, SeparationApi};
use crate::playback::PlayerCommand;
use crate::timer::{schedule_dismiss, PollTimer};
use crate::{ApiError, AtomicFileWriter, EngineEvent, FailureKind, JobId};

/// Everything the engine needs to talk to the API and handle stems locally.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiSettings,
    /// Where downloaded stems are saved.
    pub download_dir: PathBuf,
    /// Player argv; the stem file path is appended. Empty disables playback.
    pub player: Vec<String>,
}

pub fn default_player() -> Vec<String> {
    ["ffplay", "-nodisp", "-autoexit", "-loglevel", "error"]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("api client: {0}")]
    Api(#[from] ApiError),
    #[error("async runtime: {0}")]
    Runtime(#[from] io::Error),
}

/// Destination for events produced by the engine.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

enum EngineCommand {
    Upload { path: PathBuf, file_name: String },
    StartSeparation { job_id: JobId },
    FetchStatus { job_id: JobId, seq: u64 },
    FetchJobs,
    CheckHealth,
    DownloadStem {
        job_id: JobId,
        stem: String,
        file_name: String,
    },
    PlayStem { job_id: JobId, stem: String },
    StartPolling { interval: Duration },
    StopPolling,
    ScheduleDismiss { id: u64, after: Duration },
}

struct Worker {
    api: Arc<dyn SeparationApi>,
    writer: AtomicFileWriter,
    player: Option<PlayerCommand>,
}

/// Runs requests on a background tokio runtime and reports back as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let api = ReqwestApi::new(config.api)?;
        Self::with_api(Arc::new(api), config.download_dir, &config.player)
    }

    /// Builds an engine around any [`SeparationApi`] implementation.
    pub fn with_api(
        api: Arc<dyn SeparationApi>,
        download_dir: PathBuf,
        player: &[String],
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let worker = Arc::new(Worker {
            api,
            writer: AtomicFileWriter::new(download_dir),
            player: PlayerCommand::from_argv(player),
        });
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        thread::spawn(move || {
            let mut poll_timer = PollTimer::new();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartPolling { interval } => {
                        splitter_debug!("poll timer (re)started, every {:?}", interval);
                        poll_timer.start(runtime.handle(), interval, sink.clone());
                    }
                    EngineCommand::StopPolling => {
                        splitter_debug!("poll timer stopped");
                        poll_timer.stop();
                    }
                    EngineCommand::ScheduleDismiss { id, after } => {
                        schedule_dismiss(runtime.handle(), id, after, sink.clone());
                    }
                    command => {
                        let worker = worker.clone();
                        let sink = sink.clone();
                        runtime.spawn(async move {
                            handle_command(worker.as_ref(), command, sink.as_ref()).await;
                        });
                    }
                }
            }
            poll_timer.stop();
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn upload(&self, path: PathBuf, file_name: impl Into<String>) {
        self.send(EngineCommand::Upload {
            path,
            file_name: file_name.into(),
        });
    }

    pub fn start_separation(&self, job_id: impl Into<JobId>) {
        self.send(EngineCommand::StartSeparation {
            job_id: job_id.into(),
        });
    }

    pub fn fetch_status(&self, job_id: impl Into<JobId>, seq: u64) {
        self.send(EngineCommand::FetchStatus {
            job_id: job_id.into(),
            seq,
        });
    }

    pub fn fetch_jobs(&self) {
        self.send(EngineCommand::FetchJobs);
    }

    pub fn check_health(&self) {
        self.send(EngineCommand::CheckHealth);
    }

    pub fn download_stem(&self, job_id: impl Into<JobId>, stem: String, file_name: String) {
        self.send(EngineCommand::DownloadStem {
            job_id: job_id.into(),
            stem,
            file_name,
        });
    }

    pub fn play_stem(&self, job_id: impl Into<JobId>, stem: String) {
        self.send(EngineCommand::PlayStem {
            job_id: job_id.into(),
            stem,
        });
    }

    pub fn start_polling(&self, interval: Duration) {
        self.send(EngineCommand::StartPolling { interval });
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    pub fn schedule_dismiss(&self, id: u64, after: Duration) {
        self.send(EngineCommand::ScheduleDismiss { id, after });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            splitter_warn!("engine worker has stopped; command dropped");
        }
    }
}

async fn handle_command(worker: &Worker, command: EngineCommand, sink: &dyn EventSink) {
    let api = worker.api.as_ref();
    let event = match command {
        EngineCommand::Upload { path, file_name } => {
            splitter_info!("Uploading {}", path.display());
            EngineEvent::UploadFinished(api.upload(&path, &file_name).await)
        }
        EngineCommand::StartSeparation { job_id } => {
            splitter_info!("Starting separation for job {}", job_id);
            let result = api.start_separation(&job_id).await;
            EngineEvent::SeparationStarted { job_id, result }
        }
        EngineCommand::FetchStatus { job_id, seq } => {
            let result = api.status(&job_id).await;
            EngineEvent::StatusFetched {
                job_id,
                seq,
                result,
            }
        }
        EngineCommand::FetchJobs => EngineEvent::JobsFetched(api.jobs().await),
        EngineCommand::CheckHealth => EngineEvent::HealthChecked(api.health().await),
        EngineCommand::DownloadStem {
            job_id,
            stem,
            file_name,
        } => {
            let result = download_to_disk(worker, &job_id, &stem, &file_name).await;
            EngineEvent::StemDownloaded { stem, result }
        }
        EngineCommand::PlayStem { job_id, stem } => {
            let result = play(worker, &job_id, &stem).await;
            EngineEvent::PlaybackFinished { stem, result }
        }
        EngineCommand::StartPolling { .. }
        | EngineCommand::StopPolling
        | EngineCommand::ScheduleDismiss { .. } => return,
    };
    sink.emit(event);
}

async fn download_to_disk(
    worker: &Worker,
    job_id: &str,
    stem: &str,
    file_name: &str,
) -> Result<PathBuf, ApiError> {
    let audio = worker.api.download(job_id, stem).await?;
    let path = worker
        .writer
        .write(file_name, &audio)
        .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?;
    splitter_info!("Saved {} ({} bytes) to {}", stem, audio.len(), path.display());
    Ok(path)
}

async fn play(worker: &Worker, job_id: &str, stem: &str) -> Result<(), ApiError> {
    let Some(player) = worker.player.as_ref() else {
        return Err(ApiError::new(
            FailureKind::Playback,
            "no audio player configured",
        ));
    };
    let audio = worker.api.download(job_id, stem).await?;
    player.play_bytes(&audio).await
}
