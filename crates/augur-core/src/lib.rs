//! # augur-core
//! Foundation types and traits for the Augur mempool fee estimator.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{AugurError, ConfigError, RpcError, StoreError};
pub use traits::{FeeEstimator, MempoolSource, SnapshotStore};
pub use types::{BlockTarget, FeeEstimate, MempoolSnapshot, MempoolTransaction};
