//! # augur-node: Snapshot pipeline: storage, retention, collection, queries.
//!
//! Composes the Augur subsystems into a running service:
//! - [`storage::FileSnapshotStore`]: date-partitioned JSON snapshot files
//! - [`retention::RetentionManager`]: age-based partition pruning
//! - [`collector::Collector`]: periodic mempool sampling and estimate refresh
//! - [`query::FeeQueries`]: latest and historical fee estimates
//! - [`rpc::BitcoinRpcClient`]: batched JSON-RPC client for a Bitcoin node
//! - [`config::AugurConfig`]: layered configuration

pub mod collector;
pub mod config;
pub mod query;
pub mod retention;
pub mod rpc;
pub mod scheduler;
pub mod service;
pub mod storage;

pub use collector::{Collector, LatestEstimate};
pub use config::AugurConfig;
pub use query::FeeQueries;
pub use retention::{RetentionManager, SweepReport};
pub use rpc::BitcoinRpcClient;
pub use scheduler::PeriodicTask;
pub use service::AugurService;
pub use storage::FileSnapshotStore;
