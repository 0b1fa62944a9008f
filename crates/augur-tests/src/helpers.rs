//! Shared test helpers for E2E and integration tests.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use augur_core::error::RpcError;
use augur_core::traits::MempoolSource;
use augur_core::types::{MempoolSnapshot, MempoolTransaction};
use augur_node::config::{AugurConfig, RetentionMode};

type MempoolState = Result<(u64, Vec<MempoolTransaction>), RpcError>;

/// Replays a fixed sequence of mempool states, repeating the last one.
pub struct ScriptedSource {
    states: Mutex<VecDeque<MempoolState>>,
}

impl ScriptedSource {
    pub fn new(states: Vec<MempoolState>) -> Self {
        Self {
            states: Mutex::new(states.into()),
        }
    }

    /// A source that always reports the same mempool.
    pub fn constant(height: u64, transactions: Vec<MempoolTransaction>) -> Self {
        Self::new(vec![Ok((height, transactions))])
    }
}

#[async_trait]
impl MempoolSource for ScriptedSource {
    async fn mempool_state(&self) -> MempoolState {
        let mut states = self.states.lock();
        if states.len() > 1 {
            if let Some(state) = states.pop_front() {
                return state;
            }
        }
        states
            .front()
            .cloned()
            .unwrap_or_else(|| Err(RpcError::Transport("script exhausted".into())))
    }
}

/// A transaction paying `sat_per_vb` over `vbytes` virtual bytes.
pub fn tx(sat_per_vb: u64, vbytes: u64) -> MempoolTransaction {
    MempoolTransaction::new(vbytes * 4, sat_per_vb * vbytes)
}

/// A mempool spread across the given fee rates, `count` transactions each.
pub fn mempool(rates: &[u64], count: usize) -> Vec<MempoolTransaction> {
    rates
        .iter()
        .flat_map(|&rate| std::iter::repeat_n(tx(rate, 250), count))
        .collect()
}

pub fn snapshot(height: u64, at: DateTime<Utc>, transactions: Vec<MempoolTransaction>) -> MempoolSnapshot {
    MempoolSnapshot::new(height, at, transactions)
}

/// Configuration rooted at `data_dir` with the given retention policy.
pub fn config(data_dir: &Path, mode: RetentionMode, retention_days: i64) -> AugurConfig {
    let mut config = AugurConfig::default();
    config.persistence.data_directory = data_dir.to_path_buf();
    config.persistence.retention_mode = mode;
    config.persistence.retention_days = retention_days;
    config
}
