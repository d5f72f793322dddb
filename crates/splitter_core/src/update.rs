use crate::state::POLL_INTERVAL;
use crate::{
    validate_candidate, AppState, Effect, HealthState, JobStatus, Msg, Phase, Severity,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => {
            state.history_requested();
            vec![Effect::CheckHealth, Effect::FetchHistory]
        }
        Msg::FileSelected(file) => match validate_candidate(&file) {
            Ok(()) => {
                state.select_file(file);
                Vec::new()
            }
            Err(err) => vec![state.notify(Severity::Error, err.to_string())],
        },
        Msg::SubmitClicked => {
            if state.phase().is_busy() {
                return (state, Vec::new());
            }
            let Some(file) = state.selected_file().cloned() else {
                return (state, Vec::new());
            };
            if let Err(err) = validate_candidate(&file) {
                return notify_only(state, Severity::Error, err.to_string());
            }

            let mut effects = Vec::with_capacity(2);
            if state.begin_upload(file.file_name.clone()) {
                effects.push(Effect::StopPolling);
            }
            effects.push(Effect::Upload {
                path: file.path,
                file_name: file.file_name,
            });
            effects
        }
        Msg::UploadFinished(result) => {
            if state.phase() != Phase::Uploading {
                return (state, Vec::new());
            }
            match result {
                Ok(job_id) => {
                    state.upload_accepted(job_id.clone());
                    vec![Effect::StartSeparation { job_id }]
                }
                Err(failure) => {
                    state.upload_rejected();
                    vec![state.notify(Severity::Error, format!("Upload failed: {failure}"))]
                }
            }
        }
        Msg::SeparationStarted { job_id, result } => {
            if state.phase() != Phase::Uploaded
                || state.current_job_id() != Some(job_id.as_str())
            {
                return (state, Vec::new());
            }
            match result {
                Ok(()) => {
                    state.separation_started();
                    vec![Effect::StartPolling {
                        interval: POLL_INTERVAL,
                    }]
                }
                Err(failure) => {
                    state.separation_rejected();
                    vec![state.notify(
                        Severity::Error,
                        format!("Failed to start separation: {failure}"),
                    )]
                }
            }
        }
        Msg::PollTick => {
            if !matches!(state.phase(), Phase::Separating | Phase::Polling) {
                return (state, Vec::new());
            }
            let Some(job_id) = state.current_job_id().map(ToOwned::to_owned) else {
                return (state, Vec::new());
            };
            let seq = state.next_poll();
            vec![Effect::FetchStatus { job_id, seq }]
        }
        Msg::StatusReceived {
            job_id,
            seq,
            result,
        } => {
            if !state.accepts_status(&job_id, seq) {
                return (state, Vec::new());
            }
            // Failed polls are skipped; the timer keeps running.
            let Ok(report) = result else {
                return (state, Vec::new());
            };
            state.record_applied(seq);
            match report.status() {
                JobStatus::Completed => {
                    state.complete(report);
                    state.history_requested();
                    vec![Effect::StopPolling, Effect::FetchHistory]
                }
                JobStatus::Failed => {
                    let reason = report
                        .error
                        .clone()
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| "unknown error".to_string());
                    state.fail();
                    let dismiss =
                        state.notify(Severity::Error, format!("Processing failed: {reason}"));
                    vec![Effect::StopPolling, dismiss]
                }
                JobStatus::Processing => {
                    state.apply_progress(&report, true);
                    Vec::new()
                }
                JobStatus::Uploaded | JobStatus::Unknown => {
                    state.apply_progress(&report, false);
                    Vec::new()
                }
            }
        }
        Msg::HistoryRequested => {
            state.history_requested();
            vec![Effect::FetchHistory]
        }
        Msg::HistoryLoaded(result) => {
            state.history_settled();
            // A failed refresh keeps the previous listing.
            if let Ok(jobs) = result {
                state.set_history(jobs);
            }
            Vec::new()
        }
        Msg::HealthRequested => vec![Effect::CheckHealth],
        Msg::HealthChecked(result) => match result {
            Ok(report) if report.is_healthy() => {
                state.set_health(HealthState::Online {
                    device: report.device,
                });
                Vec::new()
            }
            Ok(report) => {
                let reason = format!("API reported status {}", report.status);
                health_offline(&mut state, reason)
            }
            Err(failure) => health_offline(&mut state, failure.to_string()),
        },
        Msg::PlayStemClicked { job_id, stem } => {
            state.transfer_started();
            vec![Effect::PlayStem { job_id, stem }]
        }
        Msg::PlaybackFinished { stem, result } => {
            state.transfer_settled();
            match result {
                Ok(()) => Vec::new(),
                Err(failure) => vec![state.notify(
                    Severity::Error,
                    format!("Failed to play {stem}: {failure}"),
                )],
            }
        }
        Msg::DownloadStemClicked { job_id, stem } => {
            state.transfer_started();
            let dismiss = state.notify(Severity::Info, format!("Downloading {stem}..."));
            vec![
                Effect::DownloadStem {
                    job_id,
                    file_name: format!("{stem}.wav"),
                    stem,
                },
                dismiss,
            ]
        }
        Msg::DownloadFinished { stem, result } => {
            state.transfer_settled();
            let dismiss = match result {
                Ok(saved_to) => {
                    state.notify(Severity::Success, format!("Saved {stem} to {saved_to}"))
                }
                Err(failure) => {
                    state.notify(Severity::Error, format!("Download failed: {failure}"))
                }
            };
            vec![dismiss]
        }
        Msg::NotificationExpired(id) => {
            state.dismiss(id);
            Vec::new()
        }
        Msg::ResetClicked => {
            match state.phase() {
                Phase::Idle | Phase::Completed | Phase::Failed => state.reset(),
                Phase::Uploaded if state.session().is_some_and(|s| s.halted) => state.reset(),
                _ => {}
            }
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn notify_only(mut state: AppState, severity: Severity, message: String) -> (AppState, Vec<Effect>) {
    let dismiss = state.notify(severity, message);
    (state, vec![dismiss])
}

fn health_offline(state: &mut AppState, reason: String) -> Vec<Effect> {
    let message = format!("API connection failed: {reason}");
    state.set_health(HealthState::Offline { reason });
    vec![state.notify(Severity::Error, message)]
}
