//! Estimation and collection constants. Fee rates are in sat/vB, weights in WU.

/// Satoshis per bitcoin. Node RPC reports fees in BTC.
pub const SATS_PER_BTC: f64 = 100_000_000.0;

/// Weight units per virtual byte.
pub const WU_PER_VBYTE: u64 = 4;

/// Consensus maximum block weight.
pub const BLOCK_WEIGHT_LIMIT: u64 = 4_000_000;

/// Expected seconds between blocks.
pub const BLOCK_INTERVAL_SECS: f64 = 600.0;

/// Trailing window of snapshots fed to the estimator.
pub const ESTIMATION_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Default confirmation targets, in blocks.
pub const DEFAULT_BLOCK_TARGETS: &[f64] = &[
    3.0, 6.0, 9.0, 12.0, 18.0, 24.0, 36.0, 48.0, 72.0, 96.0, 144.0,
];

/// Default confirmation probabilities.
pub const DEFAULT_PROBABILITIES: &[f64] = &[0.05, 0.20, 0.50, 0.80, 0.95];

/// Default collection tick period.
pub const DEFAULT_COLLECTION_INTERVAL_MS: u64 = 30_000;

/// Default period of the scheduled retention sweep.
pub const DEFAULT_RETENTION_INTERVAL_SECS: u64 = 3_600;

/// Default number of days of snapshot partitions to keep.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Default step used by range queries over historical estimates.
pub const DEFAULT_HISTORY_INTERVAL_SECS: i64 = 3_600;

/// Partition directory name format (local calendar date).
pub const PARTITION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Extension of persisted snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Largest confirmation target accepted from clients, one week of blocks.
pub const MAX_BLOCK_TARGET: f64 = 1_008.0;

/// Most steps a single historical range query may evaluate.
pub const MAX_HISTORY_STEPS: i64 = 1_000;
