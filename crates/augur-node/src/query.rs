//! Latest and historical fee estimate queries.
//!
//! [`FeeQueries`] answers from the collector's cached estimate or by running
//! the estimator over a fresh range read. A window without snapshots yields an
//! empty estimate, which is distinct from `None` ("nothing computed yet").

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use augur_core::constants::MAX_HISTORY_STEPS;
use augur_core::error::AugurError;
use augur_core::traits::{FeeEstimator, SnapshotStore};
use augur_core::types::FeeEstimate;

use crate::collector::LatestEstimate;
use crate::storage::trailing_window;

/// Read-side facade over the snapshot store, estimator and cached estimate.
#[derive(Clone)]
pub struct FeeQueries {
    store: Arc<dyn SnapshotStore>,
    estimator: Arc<dyn FeeEstimator>,
    latest: Arc<LatestEstimate>,
}

impl FeeQueries {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        estimator: Arc<dyn FeeEstimator>,
        latest: Arc<LatestEstimate>,
    ) -> Self {
        Self {
            store,
            estimator,
            latest,
        }
    }

    /// The collector's most recent estimate.
    pub fn latest_estimate(&self) -> Option<Arc<FeeEstimate>> {
        self.latest.load()
    }

    /// Estimate for one confirmation target over the trailing window ending now.
    ///
    /// Bypasses the cache. Empty when there are no snapshots in the window.
    pub async fn latest_estimate_for_target(
        &self,
        block_target: f64,
    ) -> Result<FeeEstimate, AugurError> {
        self.estimate_window(Utc::now(), Some(block_target)).await
    }

    /// Estimate as of `unix_seconds`, using the trailing window ending then.
    ///
    /// An empty window yields an empty estimate stamped with the requested time.
    pub async fn estimate_at_timestamp(&self, unix_seconds: i64) -> Result<FeeEstimate, AugurError> {
        let at = DateTime::<Utc>::from_timestamp(unix_seconds, 0)
            .ok_or(AugurError::InvalidTimestamp(unix_seconds))?;
        self.estimate_window(at, None).await
    }

    /// Estimates at `start, start + interval, ...` strictly before `end`.
    ///
    /// Empty steps are dropped. Returns `None` for `start > end`, a
    /// non-positive interval, or when every step is empty. Ranges of more
    /// than [`MAX_HISTORY_STEPS`] steps are rejected.
    pub async fn estimates_over_range(
        &self,
        start: i64,
        end: i64,
        interval: i64,
    ) -> Result<Option<Vec<FeeEstimate>>, AugurError> {
        if start > end || interval <= 0 {
            return Ok(None);
        }
        let steps = range_steps(start, end, interval);
        if steps > MAX_HISTORY_STEPS as i128 {
            return Err(AugurError::RangeTooLarge {
                steps,
                max: MAX_HISTORY_STEPS,
            });
        }

        let mut estimates = Vec::new();
        let mut current = start;
        while current < end {
            let estimate = self.estimate_at_timestamp(current).await?;
            if !estimate.is_empty() {
                estimates.push(estimate);
            }
            current = match current.checked_add(interval) {
                Some(next) => next,
                None => break,
            };
        }

        debug!(start, end, interval, found = estimates.len(), "historical range evaluated");
        Ok((!estimates.is_empty()).then_some(estimates))
    }

    async fn estimate_window(
        &self,
        end: DateTime<Utc>,
        block_target: Option<f64>,
    ) -> Result<FeeEstimate, AugurError> {
        let (from, to) =
            trailing_window(&end).ok_or(AugurError::InvalidTimestamp(end.timestamp()))?;
        let store = Arc::clone(&self.store);
        let estimator = Arc::clone(&self.estimator);
        tokio::task::spawn_blocking(move || {
            let window = store.range(from, to)?;
            if window.is_empty() {
                return Ok::<_, AugurError>(FeeEstimate::empty(end));
            }
            Ok(match block_target {
                Some(target) => estimator.calculate_estimates_for_target(&window, target),
                None => estimator.calculate_estimates(&window),
            })
        })
        .await
        .map_err(|e| AugurError::Task(e.to_string()))?
    }
}

/// Number of steps `start, start + interval, ...` strictly before `end`.
fn range_steps(start: i64, end: i64, interval: i64) -> i128 {
    let span = end as i128 - start as i128;
    (span + interval as i128 - 1) / interval as i128
}
