//! Core pipeline types: mempool transactions, snapshots, fee estimates.
//!
//! Weights are in weight units (WU), fees in satoshis, fee rates in sat/vB.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::constants::WU_PER_VBYTE;

/// Minimal per-transaction facts needed for fee estimation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MempoolTransaction {
    /// Transaction weight in weight units.
    pub weight: u64,
    /// Absolute fee in satoshis.
    pub fee: u64,
}

impl MempoolTransaction {
    pub fn new(weight: u64, fee: u64) -> Self {
        Self { weight, fee }
    }

    /// Fee rate in sat/vB, or 0.0 for a zero-weight transaction.
    pub fn fee_rate(&self) -> f64 {
        if self.weight == 0 {
            return 0.0;
        }
        (self.fee as f64) * (WU_PER_VBYTE as f64) / (self.weight as f64)
    }
}

/// Point-in-time sample of a node's mempool.
///
/// The on-disk JSON form is `{"blockHeight", "timestamp", "transactions"}`
/// with the timestamp rendered as ISO-8601 UTC at millisecond precision.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MempoolSnapshot {
    /// Chain height at capture time.
    pub block_height: u64,
    /// Capture time, millisecond precision.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Transactions observed in the mempool.
    pub transactions: Vec<MempoolTransaction>,
}

impl MempoolSnapshot {
    /// Build a snapshot. The timestamp is truncated to whole milliseconds so
    /// that a persisted snapshot reads back identical to the original.
    pub fn new(
        block_height: u64,
        timestamp: DateTime<Utc>,
        transactions: Vec<MempoolTransaction>,
    ) -> Self {
        Self {
            block_height,
            timestamp: timestamp.trunc_subsecs(3),
            transactions,
        }
    }

    /// Snapshot with no transactions.
    pub fn empty(block_height: u64, timestamp: DateTime<Utc>) -> Self {
        Self::new(block_height, timestamp, Vec::new())
    }

    /// Sum of all transaction weights.
    pub fn total_weight(&self) -> u64 {
        self.transactions.iter().map(|tx| tx.weight).sum()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// Fee rates for one confirmation target, keyed by confirmation probability.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockTarget {
    pub probabilities: BTreeMap<OrderedFloat<f64>, f64>,
}

impl BlockTarget {
    /// Fee rate for `probability`, if the model produced one.
    pub fn fee_rate(&self, probability: f64) -> Option<f64> {
        self.probabilities.get(&OrderedFloat(probability)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Estimator output: fee rates per confirmation target and probability.
///
/// An estimate with no targets is a valid "no data" answer, distinct from
/// having no estimate at all.
#[derive(Clone, Debug, PartialEq)]
pub struct FeeEstimate {
    /// Capture time of the newest snapshot the estimate was built from.
    pub timestamp: DateTime<Utc>,
    pub estimates: BTreeMap<OrderedFloat<f64>, BlockTarget>,
}

impl FeeEstimate {
    /// An estimate without any targets.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            estimates: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Fee rate for a `(target, probability)` pair.
    pub fn fee_rate(&self, block_target: f64, probability: f64) -> Option<f64> {
        self.estimates
            .get(&OrderedFloat(block_target))
            .and_then(|target| target.fee_rate(probability))
    }

    /// A copy of this estimate restricted to one confirmation target.
    pub fn for_target(&self, block_target: f64) -> FeeEstimate {
        let estimates = self
            .estimates
            .get(&OrderedFloat(block_target))
            .map(|target| BTreeMap::from([(OrderedFloat(block_target), target.clone())]))
            .unwrap_or_default();
        FeeEstimate {
            timestamp: self.timestamp,
            estimates,
        }
    }

    /// Confirmation targets present, ascending.
    pub fn targets(&self) -> impl Iterator<Item = f64> + '_ {
        self.estimates.keys().map(|k| k.into_inner())
    }
}

/// Render a timestamp as ISO-8601 UTC with millisecond precision.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fee_rate_in_sat_per_vbyte() {
        let tx = MempoolTransaction::new(400, 1000);
        assert_eq!(tx.fee_rate(), 10.0);
    }

    #[test]
    fn fee_rate_zero_weight() {
        assert_eq!(MempoolTransaction::new(0, 1000).fee_rate(), 0.0);
    }

    #[test]
    fn snapshot_truncates_to_millis() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let snapshot = MempoolSnapshot::empty(800_000, ts);
        assert_eq!(snapshot.timestamp.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn snapshot_json_layout() {
        let ts = Utc.timestamp_opt(1_700_000_000, 5_000_000).unwrap();
        let snapshot = MempoolSnapshot::new(812_345, ts, vec![MempoolTransaction::new(561, 2_000)]);
        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["blockHeight"], 812_345);
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20.005Z");
        assert_eq!(json["transactions"][0]["weight"], 561);
        assert_eq!(json["transactions"][0]["fee"], 2_000);
    }

    #[test]
    fn snapshot_reads_offset_timestamps() {
        let raw = r#"{"blockHeight":1,"timestamp":"2024-03-01T12:00:00.250+02:00","transactions":[]}"#;
        let snapshot: MempoolSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(
            snapshot.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn snapshot_totals() {
        let snapshot = MempoolSnapshot::new(
            1,
            Utc::now(),
            vec![MempoolTransaction::new(400, 1), MempoolTransaction::new(600, 2)],
        );
        assert_eq!(snapshot.total_weight(), 1_000);
        assert_eq!(snapshot.transaction_count(), 2);
    }

    fn sample_estimate() -> FeeEstimate {
        let mut estimate = FeeEstimate::empty(Utc::now());
        for target in [3.0, 6.0] {
            let mut block_target = BlockTarget::default();
            block_target.probabilities.insert(OrderedFloat(0.5), 10.0 / target);
            block_target.probabilities.insert(OrderedFloat(0.95), 20.0 / target);
            estimate.estimates.insert(OrderedFloat(target), block_target);
        }
        estimate
    }

    #[test]
    fn fee_rate_lookup() {
        let estimate = sample_estimate();
        assert_eq!(estimate.fee_rate(3.0, 0.95), Some(20.0 / 3.0));
        assert_eq!(estimate.fee_rate(3.0, 0.2), None);
        assert_eq!(estimate.fee_rate(9.0, 0.5), None);
    }

    #[test]
    fn for_target_keeps_one_entry() {
        let estimate = sample_estimate();
        let six = estimate.for_target(6.0);
        assert_eq!(six.targets().collect::<Vec<_>>(), vec![6.0]);
        assert_eq!(six.timestamp, estimate.timestamp);
        assert!(estimate.for_target(144.0).is_empty());
    }
}
