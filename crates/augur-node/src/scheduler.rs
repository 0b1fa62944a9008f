//! Fixed-rate background tasks with cooperative cancellation.
//!
//! A [`PeriodicTask`] runs an async job on a tokio interval. The shutdown
//! signal is only observed between runs, so stopping a task never interrupts
//! a job that has already started.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Handle to a running periodic job.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `job` every `period`, starting immediately.
    ///
    /// Runs are fixed-rate; if a run overruns the period the missed ticks are
    /// skipped rather than fired back to back.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => job().await,
                }
            }
            debug!(task = name, "periodic task stopped");
        });
        debug!(task = name, period_ms = period.as_millis() as u64, "periodic task started");
        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Cancel future runs and wait for an in-flight run to complete.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(task = self.name, "periodic task ended abnormally: {e}");
        }
    }
}
