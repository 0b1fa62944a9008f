//! Service wiring.
//!
//! [`AugurService`] owns every long-lived component: the snapshot store, the
//! retention manager, the collector and the query facade. It starts the
//! background tasks and stops them again on shutdown.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use augur_core::error::AugurError;
use augur_core::traits::{FeeEstimator, MempoolSource, SnapshotStore};
use augur_estimator::FeeModel;

use crate::collector::{Collector, LatestEstimate};
use crate::config::{AugurConfig, RetentionMode};
use crate::query::FeeQueries;
use crate::retention::RetentionManager;
use crate::rpc::BitcoinRpcClient;
use crate::scheduler::PeriodicTask;
use crate::storage::FileSnapshotStore;

/// A fully wired Augur instance.
pub struct AugurService {
    config: AugurConfig,
    store: Arc<FileSnapshotStore>,
    retention: RetentionManager,
    collector: Arc<Collector>,
    queries: FeeQueries,
    retention_task: Mutex<Option<PeriodicTask>>,
}

impl AugurService {
    /// Wire a service that samples the Bitcoin node named in `config`.
    pub fn build(config: AugurConfig) -> Result<Self, AugurError> {
        let rpc = &config.bitcoin_rpc;
        let source = BitcoinRpcClient::new(&rpc.url, &rpc.username, &rpc.password)?;
        info!(endpoint = source.endpoint(), "bitcoin rpc client ready");
        Self::with_source(config, Arc::new(source))
    }

    /// Wire a service around an arbitrary mempool source.
    pub fn with_source(
        config: AugurConfig,
        source: Arc<dyn MempoolSource>,
    ) -> Result<Self, AugurError> {
        let persistence = &config.persistence;
        let retention =
            RetentionManager::new(&persistence.data_directory, persistence.retention_days);

        let mut store = FileSnapshotStore::open(&persistence.data_directory)?;
        if persistence.retention_mode == RetentionMode::Inline && retention.is_enabled() {
            store = store.with_inline_retention(retention.clone());
        }
        let store = Arc::new(store);
        info!(
            data_dir = %store.data_dir().display(),
            retention_days = persistence.retention_days,
            retention_mode = ?persistence.retention_mode,
            "snapshot store opened"
        );

        let estimator: Arc<dyn FeeEstimator> = Arc::new(FeeModel::new());
        let latest = Arc::new(LatestEstimate::new());
        let dyn_store: Arc<dyn SnapshotStore> = store.clone();

        let collector = Arc::new(Collector::new(
            source,
            Arc::clone(&dyn_store),
            Arc::clone(&estimator),
            Arc::clone(&latest),
            config.collection_interval(),
        ));
        let queries = FeeQueries::new(dyn_store, estimator, latest);

        Ok(Self {
            config,
            store,
            retention,
            collector,
            queries,
            retention_task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AugurConfig {
        &self.config
    }

    pub fn store(&self) -> &FileSnapshotStore {
        &self.store
    }

    pub fn retention(&self) -> &RetentionManager {
        &self.retention
    }

    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    /// A cloneable handle for request handlers.
    pub fn queries(&self) -> FeeQueries {
        self.queries.clone()
    }

    /// Start collection and, in scheduled mode, periodic retention.
    ///
    /// Must be called from within a tokio runtime. Calling it twice is a no-op.
    pub fn start(&self) {
        self.collector.start();

        if self.config.persistence.retention_mode != RetentionMode::Scheduled
            || !self.retention.is_enabled()
        {
            return;
        }
        let mut slot = self.retention_task.lock();
        if slot.is_some() {
            return;
        }
        let retention = self.retention.clone();
        *slot = Some(PeriodicTask::spawn(
            "retention",
            self.config.retention_interval(),
            move || {
                let retention = retention.clone();
                async move {
                    if let Err(e) = tokio::task::spawn_blocking(move || retention.sweep()).await {
                        warn!("retention sweep panicked: {e}");
                    }
                }
            },
        ));
        info!(
            interval_secs = self.config.persistence.retention_interval_secs,
            retention_days = self.retention.retention_days(),
            "scheduled retention started"
        );
    }

    /// Stop background tasks, letting in-flight runs finish.
    pub async fn shutdown(&self) {
        self.collector.stop().await;
        let task = self.retention_task.lock().take();
        if let Some(task) = task {
            task.stop().await;
            info!("scheduled retention stopped");
        }
    }
}
