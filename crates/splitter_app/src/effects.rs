use std::time::Duration;

use splitter_core::{
    Effect, Failure, HealthReport, JobStatus, JobSummary, MetricValue, Msg, StatusReport,
};
use splitter_engine::{
    ApiError, EngineEvent, EngineHandle, FailureKind, HealthResponse, JobRecord, MetricReading,
    StatusResponse, WireStatus,
};
use splitter_logging::{splitter_debug, splitter_warn};

/// Executes reducer effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            splitter_debug!("effect {:?}", effect);
            match effect {
                Effect::CheckHealth => self.engine.check_health(),
                Effect::FetchHistory => self.engine.fetch_jobs(),
                Effect::Upload { path, file_name } => self.engine.upload(path, file_name),
                Effect::StartSeparation { job_id } => self.engine.start_separation(job_id),
                Effect::StartPolling { interval } => self.engine.start_polling(interval),
                Effect::StopPolling => self.engine.stop_polling(),
                Effect::FetchStatus { job_id, seq } => self.engine.fetch_status(job_id, seq),
                Effect::PlayStem { job_id, stem } => self.engine.play_stem(job_id, stem),
                Effect::DownloadStem {
                    job_id,
                    stem,
                    file_name,
                } => self.engine.download_stem(job_id, stem, file_name),
                Effect::ScheduleDismiss { id, after } => self.engine.schedule_dismiss(id, after),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadFinished(result) => {
            Msg::UploadFinished(result.map(|receipt| receipt.job_id).map_err(map_failure))
        }
        EngineEvent::SeparationStarted { job_id, result } => Msg::SeparationStarted {
            job_id,
            result: result.map_err(map_failure),
        },
        EngineEvent::StatusFetched {
            job_id,
            seq,
            result,
        } => {
            if let Err(err) = &result {
                splitter_warn!("Status poll {} for job {} failed: {}", seq, job_id, err);
            }
            Msg::StatusReceived {
                job_id,
                seq,
                result: result.map(map_status).map_err(map_failure),
            }
        }
        EngineEvent::JobsFetched(result) => {
            if let Err(err) = &result {
                splitter_warn!("Loading job history failed: {}", err);
            }
            Msg::HistoryLoaded(
                result
                    .map(|jobs| jobs.into_iter().map(map_job).collect())
                    .map_err(map_failure),
            )
        }
        EngineEvent::HealthChecked(result) => {
            Msg::HealthChecked(result.map(map_health).map_err(map_failure))
        }
        EngineEvent::StemDownloaded { stem, result } => Msg::DownloadFinished {
            stem,
            result: result
                .map(|path| path.display().to_string())
                .map_err(map_failure),
        },
        EngineEvent::PlaybackFinished { stem, result } => Msg::PlaybackFinished {
            stem,
            result: result.map_err(map_failure),
        },
        EngineEvent::PollDue => Msg::PollTick,
        EngineEvent::NotificationDue(id) => Msg::NotificationExpired(id),
    }
}

fn map_failure(err: ApiError) -> Failure {
    match err.kind {
        FailureKind::HttpStatus(status) => Failure::Api {
            status,
            message: err.message,
        },
        _ => Failure::Transport(err.message),
    }
}

fn map_wire_status(status: WireStatus) -> JobStatus {
    match status {
        WireStatus::Uploaded => JobStatus::Uploaded,
        WireStatus::Processing => JobStatus::Processing,
        WireStatus::Completed => JobStatus::Completed,
        WireStatus::Failed => JobStatus::Failed,
        WireStatus::Unknown => JobStatus::Unknown,
    }
}

fn map_status(response: StatusResponse) -> StatusReport {
    StatusReport {
        status: Some(map_wire_status(response.status)),
        progress: response.progress,
        stems: response.stems,
        quality_metrics: response
            .quality_metrics
            .into_iter()
            .map(|(name, reading)| (name, map_metric(reading)))
            .collect(),
        error: response.error,
    }
}

fn map_metric(reading: MetricReading) -> MetricValue {
    match reading {
        MetricReading::Number(value) => MetricValue::Number(value),
        MetricReading::Text(text) => MetricValue::Text(text),
    }
}

fn map_job(record: JobRecord) -> JobSummary {
    JobSummary {
        job_id: record.job_id,
        filename: record.filename,
        status: map_wire_status(record.status),
        progress: record.progress,
    }
}

fn map_health(response: HealthResponse) -> HealthReport {
    HealthReport {
        status: response.status,
        device: response.device,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use pretty_assertions::assert_eq;

    fn api_error(kind: FailureKind, message: &str) -> ApiError {
        ApiError {
            kind,
            message: message.to_string(),
        }
    }

    #[test]
    fn http_errors_keep_status_and_message() {
        let msg = map_event(EngineEvent::UploadFinished(Err(api_error(
            FailureKind::HttpStatus(400),
            "Invalid file type",
        ))));
        assert_eq!(
            msg,
            Msg::UploadFinished(Err(Failure::Api {
                status: 400,
                message: "Invalid file type".to_string()
            }))
        );
    }

    #[test]
    fn transport_errors_carry_the_message() {
        let msg = map_event(EngineEvent::SeparationStarted {
            job_id: "j1".to_string(),
            result: Err(api_error(FailureKind::Timeout, "operation timed out")),
        });
        assert_eq!(
            msg,
            Msg::SeparationStarted {
                job_id: "j1".to_string(),
                result: Err(Failure::Transport("operation timed out".to_string())),
            }
        );
    }

    #[test]
    fn status_reply_keeps_job_and_sequence() {
        let mut stems = BTreeMap::new();
        stems.insert("vocals".to_string(), "/tmp/vocals.wav".to_string());
        let msg = map_event(EngineEvent::StatusFetched {
            job_id: "j1".to_string(),
            seq: 4,
            result: Ok(StatusResponse {
                status: WireStatus::Completed,
                progress: 1.0,
                stems: stems.clone(),
                quality_metrics: [("vocals.rms_energy".to_string(), MetricReading::Number(0.05))]
                    .into_iter()
                    .collect(),
                error: None,
            }),
        });
        assert_eq!(
            msg,
            Msg::StatusReceived {
                job_id: "j1".to_string(),
                seq: 4,
                result: Ok(StatusReport {
                    status: Some(JobStatus::Completed),
                    progress: 1.0,
                    stems,
                    quality_metrics: [("vocals.rms_energy".to_string(), MetricValue::Number(0.05))]
                        .into_iter()
                        .collect(),
                    error: None,
                }),
            }
        );
    }

    #[test]
    fn history_records_become_summaries() {
        let msg = map_event(EngineEvent::JobsFetched(Ok(vec![JobRecord {
            job_id: "abc".to_string(),
            filename: None,
            status: WireStatus::Unknown,
            progress: 0.3,
        }])));
        assert_eq!(
            msg,
            Msg::HistoryLoaded(Ok(vec![JobSummary {
                job_id: "abc".to_string(),
                filename: None,
                status: JobStatus::Unknown,
                progress: 0.3,
            }]))
        );
    }

    #[test]
    fn timers_and_downloads_map_directly() {
        assert_eq!(map_event(EngineEvent::PollDue), Msg::PollTick);
        assert_eq!(
            map_event(EngineEvent::NotificationDue(7)),
            Msg::NotificationExpired(7)
        );
        let saved = PathBuf::from("stems").join("drums.wav");
        assert_eq!(
            map_event(EngineEvent::StemDownloaded {
                stem: "drums".to_string(),
                result: Ok(saved.clone()),
            }),
            Msg::DownloadFinished {
                stem: "drums".to_string(),
                result: Ok(saved.display().to_string()),
            }
        );
    }
}
