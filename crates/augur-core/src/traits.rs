//! Trait interfaces for the Augur pipeline.
//!
//! These traits define the seams between crates:
//! - [`SnapshotStore`]: durable snapshot persistence (augur-node implements)
//! - [`FeeEstimator`]: fee model over a snapshot window (augur-estimator implements)
//! - [`MempoolSource`]: current mempool state from a node (augur-node implements)

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::{RpcError, StoreError};
use crate::types::{FeeEstimate, MempoolSnapshot, MempoolTransaction};

/// Durable storage of mempool snapshots, queried by local wall-clock time.
///
/// Implementations perform blocking I/O; async callers should hop onto a
/// blocking thread before calling in.
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot. Never mutates previously stored snapshots.
    fn append(&self, snapshot: &MempoolSnapshot) -> Result<(), StoreError>;

    /// All snapshots whose local timestamp lies in `[start, end]`, oldest first.
    ///
    /// Unreadable entries are skipped rather than failing the whole query.
    fn range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<MempoolSnapshot>, StoreError>;
}

/// Fee-rate model over an ordered window of snapshots.
///
/// Treated as a pure function: the same window always yields the same estimate.
pub trait FeeEstimator: Send + Sync {
    /// Estimates for every configured confirmation target.
    fn calculate_estimates(&self, snapshots: &[MempoolSnapshot]) -> FeeEstimate;

    /// Estimates for a single confirmation target, in blocks.
    fn calculate_estimates_for_target(
        &self,
        snapshots: &[MempoolSnapshot],
        block_target: f64,
    ) -> FeeEstimate;
}

/// Source of the node's current mempool contents.
#[async_trait]
pub trait MempoolSource: Send + Sync {
    /// Current chain height and the fee/weight of every unconfirmed transaction.
    async fn mempool_state(&self) -> Result<(u64, Vec<MempoolTransaction>), RpcError>;
}
