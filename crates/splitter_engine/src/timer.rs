use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, EventSink};

/// The single repeating status-poll timer.
///
/// Starting it again replaces the running one, so at most one ticks at a time.
#[derive(Debug, Default)]
pub struct PollTimer {
    cancel: Option<CancellationToken>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits [`EngineEvent::PollDue`] every `period`, first one `period` from now.
    pub fn start(&mut self, handle: &Handle, period: Duration, sink: Arc<dyn EventSink>) {
        self.stop();
        let period = period.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let cancelled = token.clone();

        handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => sink.emit(EngineEvent::PollDue),
                }
            }
        });
        self.cancel = Some(token);
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Emits [`EngineEvent::NotificationDue`] once `after` has elapsed.
pub fn schedule_dismiss(handle: &Handle, id: u64, after: Duration, sink: Arc<dyn EventSink>) {
    handle.spawn(async move {
        tokio::time::sleep(after).await;
        sink.emit(EngineEvent::NotificationDue(id));
    });
}
