//! # augur-estimator — Fee-rate model over mempool snapshots.
//!
//! Implements [`augur_core::FeeEstimator`]:
//! - **Fee-rate buckets**: transactions are grouped on a logarithmic fee-rate
//!   scale so that nearby rates share a bucket.
//! - **Inflow**: weight arriving per bucket is measured from the growth
//!   between consecutive snapshots in the recent part of the window.
//! - **Block arrivals**: the number of blocks mined before a target is
//!   modelled as Poisson, and each probability picks a quantile of it.
//! - **Clearing rate**: the answer is the lowest bucket whose backlog plus
//!   inflow still fits in the blocks expected with that probability.

pub mod buckets;
pub mod engine;
pub mod poisson;

pub use engine::FeeModel;
