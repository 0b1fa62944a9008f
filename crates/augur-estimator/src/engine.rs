//! Fee model implementing the [`FeeEstimator`] trait.
//!
//! Combines the bucketed backlog of the newest snapshot with the recent
//! inflow rate and a Poisson block-arrival quantile to find, for every
//! `(target, probability)` pair, the lowest fee rate expected to clear.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use tracing::debug;

use augur_core::constants::{
    BLOCK_INTERVAL_SECS, BLOCK_WEIGHT_LIMIT, DEFAULT_BLOCK_TARGETS, DEFAULT_PROBABILITIES,
};
use augur_core::traits::FeeEstimator;
use augur_core::types::{BlockTarget, FeeEstimate, MempoolSnapshot};

use crate::buckets::{bucket_fee_rate, bucket_weights, inflow_rates, max_bucket};
use crate::poisson::blocks_mined_quantile;

/// Default look-back used to measure inflow.
pub const DEFAULT_INFLOW_WINDOW_SECS: i64 = 60 * 60;

/// The production fee model.
#[derive(Debug, Clone)]
pub struct FeeModel {
    block_targets: Vec<f64>,
    probabilities: Vec<f64>,
    inflow_window_secs: i64,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            block_targets: DEFAULT_BLOCK_TARGETS.to_vec(),
            probabilities: DEFAULT_PROBABILITIES.to_vec(),
            inflow_window_secs: DEFAULT_INFLOW_WINDOW_SECS,
        }
    }
}

impl FeeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the confirmation probabilities, each in (0, 1].
    pub fn with_probabilities(mut self, probabilities: Vec<f64>) -> Self {
        let mut probabilities: Vec<f64> = probabilities
            .into_iter()
            .filter(|p| *p > 0.0 && *p <= 1.0)
            .collect();
        probabilities.sort_by(f64::total_cmp);
        self.probabilities = probabilities;
        self
    }

    fn estimate(&self, snapshots: &[MempoolSnapshot], targets: &[f64]) -> FeeEstimate {
        let Some(newest) = snapshots.last() else {
            return FeeEstimate::empty(DateTime::<Utc>::default());
        };
        let backlog = bucket_weights(&newest.transactions);
        let inflow = inflow_rates(snapshots, self.inflow_window_secs);

        let mut estimate = FeeEstimate::empty(newest.timestamp);
        for &target in targets {
            let block_target = self.estimate_target(&backlog, &inflow, target);
            if !block_target.is_empty() {
                estimate.estimates.insert(OrderedFloat(target), block_target);
            }
        }

        debug!(
            snapshots = snapshots.len(),
            backlog_buckets = backlog.len(),
            inflow_buckets = inflow.len(),
            targets = estimate.estimates.len(),
            "fee estimate computed"
        );
        estimate
    }

    fn estimate_target(
        &self,
        backlog: &BTreeMap<i32, u64>,
        inflow: &BTreeMap<i32, f64>,
        target: f64,
    ) -> BlockTarget {
        let mut block_target = BlockTarget::default();
        if target <= 0.0 || !target.is_finite() {
            return block_target;
        }
        let horizon_secs = target * BLOCK_INTERVAL_SECS;

        // Backlog plus expected arrivals per bucket, highest fee rate first.
        let mut buckets: BTreeMap<i32, f64> = BTreeMap::new();
        for (bucket, weight) in backlog {
            *buckets.entry(*bucket).or_insert(0.0) += *weight as f64;
        }
        for (bucket, rate) in inflow {
            *buckets.entry(*bucket).or_insert(0.0) += rate * horizon_secs;
        }

        // Probabilities ascend; the running maximum keeps rates non-decreasing.
        let mut floor = 0.0f64;
        for &probability in self.probabilities.iter() {
            let blocks = blocks_mined_quantile(target, probability);
            let rate = clearing_rate(&buckets, blocks as f64 * BLOCK_WEIGHT_LIMIT as f64);
            floor = floor.max(rate);
            block_target
                .probabilities
                .insert(OrderedFloat(probability), round4(floor));
        }
        block_target
    }
}

/// Lowest bucket rate whose cumulative weight, from the top bucket down,
/// still fits in `capacity`. Zero capacity yields the top occupied bucket.
fn clearing_rate(buckets: &BTreeMap<i32, f64>, capacity: f64) -> f64 {
    let mut cumulative = 0.0;
    let mut lowest_fitting: Option<i32> = None;
    for (bucket, weight) in buckets.iter().rev() {
        cumulative += weight;
        if cumulative > capacity {
            return match lowest_fitting {
                Some(fitting) => bucket_fee_rate(fitting),
                None => bucket_fee_rate((*bucket + 1).min(max_bucket())),
            };
        }
        lowest_fitting = Some(*bucket);
    }
    bucket_fee_rate(0)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

impl FeeEstimator for FeeModel {
    fn calculate_estimates(&self, snapshots: &[MempoolSnapshot]) -> FeeEstimate {
        self.estimate(snapshots, &self.block_targets)
    }

    fn calculate_estimates_for_target(
        &self,
        snapshots: &[MempoolSnapshot],
        block_target: f64,
    ) -> FeeEstimate {
        self.estimate(snapshots, &[block_target])
    }
}
