//! Periodic mempool collection.
//!
//! Each tick samples the node, appends a snapshot to the store, re-reads the
//! trailing estimation window and refreshes [`LatestEstimate`]. A failing
//! tick is logged and the next scheduled tick runs as usual.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use augur_core::error::AugurError;
use augur_core::traits::{FeeEstimator, MempoolSource, SnapshotStore};
use augur_core::types::{FeeEstimate, MempoolSnapshot};

use crate::scheduler::PeriodicTask;
use crate::storage::trailing_window;

/// Single-slot holder of the most recent estimate.
///
/// Reads are lock-free and always observe a complete estimate; the collector
/// replaces it wholesale.
#[derive(Debug, Default)]
pub struct LatestEstimate {
    slot: ArcSwapOption<FeeEstimate>,
}

impl LatestEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current estimate, or `None` if none has been computed yet.
    pub fn load(&self) -> Option<Arc<FeeEstimate>> {
        self.slot.load_full()
    }

    pub fn store(&self, estimate: FeeEstimate) {
        self.slot.store(Some(Arc::new(estimate)));
    }
}

/// Result of a successful tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The cached estimate was replaced using this many snapshots.
    Updated { snapshots: usize },
    /// The trailing window was empty; the cached estimate was kept.
    NoData,
}

/// Samples the mempool on a fixed schedule.
pub struct Collector {
    source: Arc<dyn MempoolSource>,
    store: Arc<dyn SnapshotStore>,
    estimator: Arc<dyn FeeEstimator>,
    latest: Arc<LatestEstimate>,
    interval: Duration,
    task: Mutex<Option<PeriodicTask>>,
}

impl Collector {
    pub fn new(
        source: Arc<dyn MempoolSource>,
        store: Arc<dyn SnapshotStore>,
        estimator: Arc<dyn FeeEstimator>,
        latest: Arc<LatestEstimate>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            estimator,
            latest,
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn latest(&self) -> Arc<LatestEstimate> {
        Arc::clone(&self.latest)
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Start ticking. Returns `false` if the collector was already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut task = self.task.lock();
        if task.is_some() {
            return false;
        }
        let collector = Arc::clone(self);
        *task = Some(PeriodicTask::spawn("collector", self.interval, move || {
            let collector = Arc::clone(&collector);
            async move { collector.run_tick().await }
        }));
        info!(interval_ms = self.interval.as_millis() as u64, "mempool collector started");
        true
    }

    /// Stop ticking. An in-flight tick is allowed to finish.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.stop().await;
            info!("mempool collector stopped");
        }
    }

    async fn run_tick(&self) {
        match self.tick().await {
            Ok(TickOutcome::Updated { snapshots }) => {
                debug!(snapshots, "fee estimate refreshed");
            }
            Ok(TickOutcome::NoData) => {
                warn!("no snapshots in the estimation window; keeping previous estimate");
            }
            Err(e) => error!("collection tick failed: {e}"),
        }
    }

    /// Run one collection cycle.
    pub async fn tick(&self) -> Result<TickOutcome, AugurError> {
        let (height, transactions) = self.source.mempool_state().await?;
        let snapshot = MempoolSnapshot::new(height, Utc::now(), transactions);
        info!(
            height,
            transactions = snapshot.transaction_count(),
            weight = snapshot.total_weight(),
            "mempool sampled"
        );

        let store = Arc::clone(&self.store);
        let estimator = Arc::clone(&self.estimator);
        let refreshed = tokio::task::spawn_blocking(move || {
            if let Err(e) = store.append(&snapshot) {
                error!(height = snapshot.block_height, "failed to persist snapshot: {e}");
            }
            let (start, end) = trailing_window(&snapshot.timestamp)
                .ok_or(AugurError::InvalidTimestamp(snapshot.timestamp.timestamp()))?;
            let window = store.range(start, end)?;
            if window.is_empty() {
                return Ok::<_, AugurError>(None);
            }
            Ok(Some((window.len(), estimator.calculate_estimates(&window))))
        })
        .await
        .map_err(|e| AugurError::Task(e.to_string()))??;

        match refreshed {
            Some((snapshots, estimate)) => {
                self.latest.store(estimate);
                Ok(TickOutcome::Updated { snapshots })
            }
            None => Ok(TickOutcome::NoData),
        }
    }
}
