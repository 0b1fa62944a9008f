//! Error types for the Augur pipeline.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("io error at {path}: {message}")] Io { path: String, message: String },
    #[error("serialization: {0}")] Serialization(String),
}

impl StoreError {
    /// Wrap an [`std::io::Error`] together with the path it concerns.
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        StoreError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport: {0}")] Transport(String),
    #[error("http status {0}")] HttpStatus(u16),
    #[error("{method} returned error: {message}")] Call { method: String, message: String },
    #[error("missing response for {0}")] MissingResponse(String),
    #[error("mempool is not loaded")] MempoolNotLoaded,
    #[error("chain height missing from getblockchaininfo")] MissingHeight,
    #[error("invalid response: {0}")] InvalidResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")] Load(String),
    #[error("invalid value for {key}: {message}")] InvalidValue { key: String, message: String },
}

#[derive(Error, Debug)]
pub enum AugurError {
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Rpc(#[from] RpcError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error("timestamp out of range: {0}")] InvalidTimestamp(i64),
    #[error("range spans {steps} steps, limit is {max}")] RangeTooLarge { steps: i128, max: i64 },
    #[error("task failed: {0}")] Task(String),
}
