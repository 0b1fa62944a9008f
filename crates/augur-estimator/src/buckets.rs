//! Logarithmic fee-rate bucketing.
//!
//! Bucket `i` covers fee rates around `exp(i / BUCKET_PRECISION)` sat/vB.
//! Rates below 1 sat/vB land in bucket 0; rates above [`MAX_FEE_RATE`] land
//! in the top bucket.

use std::collections::BTreeMap;

use augur_core::{MempoolSnapshot, MempoolTransaction};

/// Buckets per unit of natural log of the fee rate.
pub const BUCKET_PRECISION: f64 = 100.0;

/// Fee rate represented by the highest bucket, in sat/vB.
pub const MAX_FEE_RATE: f64 = 10_000.0;

/// Index of the highest bucket.
pub fn max_bucket() -> i32 {
    (MAX_FEE_RATE.ln() * BUCKET_PRECISION).round() as i32
}

/// Bucket index for a fee rate.
pub fn bucket_index(fee_rate: f64) -> i32 {
    if !fee_rate.is_finite() || fee_rate <= 1.0 {
        return if fee_rate.is_infinite() { max_bucket() } else { 0 };
    }
    ((fee_rate.ln() * BUCKET_PRECISION).round() as i32).min(max_bucket())
}

/// Representative fee rate of a bucket.
pub fn bucket_fee_rate(index: i32) -> f64 {
    (index as f64 / BUCKET_PRECISION).exp()
}

/// Total weight per bucket.
pub fn bucket_weights(transactions: &[MempoolTransaction]) -> BTreeMap<i32, u64> {
    let mut buckets = BTreeMap::new();
    for tx in transactions {
        *buckets.entry(bucket_index(tx.fee_rate())).or_insert(0u64) += tx.weight;
    }
    buckets
}

/// Weight arriving per second in each bucket.
///
/// Only snapshots within `window_secs` of the newest one are considered. For
/// each consecutive pair the positive weight growth of every bucket counts as
/// inflow; shrinkage (mined or evicted transactions) is ignored. Returns an
/// empty map when fewer than two snapshots span a positive interval.
pub fn inflow_rates(snapshots: &[MempoolSnapshot], window_secs: i64) -> BTreeMap<i32, f64> {
    let Some(newest) = snapshots.last() else {
        return BTreeMap::new();
    };
    let horizon = newest.timestamp - chrono::Duration::seconds(window_secs);
    let recent: Vec<BTreeMap<i32, u64>> = snapshots
        .iter()
        .filter(|s| s.timestamp >= horizon)
        .map(|s| bucket_weights(&s.transactions))
        .collect();
    let first_ts = snapshots
        .iter()
        .find(|s| s.timestamp >= horizon)
        .map(|s| s.timestamp)
        .unwrap_or(newest.timestamp);

    let elapsed = (newest.timestamp - first_ts).num_milliseconds() as f64 / 1_000.0;
    if recent.len() < 2 || elapsed <= 0.0 {
        return BTreeMap::new();
    }

    let mut added: BTreeMap<i32, u64> = BTreeMap::new();
    for pair in recent.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        for (bucket, weight) in after {
            let previous = before.get(bucket).copied().unwrap_or(0);
            if *weight > previous {
                *added.entry(*bucket).or_insert(0) += weight - previous;
            }
        }
    }

    added
        .into_iter()
        .map(|(bucket, weight)| (bucket, weight as f64 / elapsed))
        .collect()
}
