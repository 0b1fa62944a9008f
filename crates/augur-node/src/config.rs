//! Service configuration.
//!
//! Layers, lowest precedence first: the bundled `config/default.toml`, an
//! optional external file, then environment variables. A configuration that
//! fails to load or validate falls back to the defaults with a warning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::warn;

use augur_core::constants::{
    DEFAULT_COLLECTION_INTERVAL_MS, DEFAULT_RETENTION_DAYS, DEFAULT_RETENTION_INTERVAL_SECS,
};
use augur_core::error::ConfigError;

const BUNDLED_DEFAULTS: &str = include_str!("../config/default.toml");

/// Environment variable naming an external configuration file.
pub const CONFIG_FILE_ENV: &str = "AUGUR_CONFIG_FILE";

/// Environment variables and the configuration keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("AUGUR_SERVER_HOST", "server.host"),
    ("AUGUR_SERVER_PORT", "server.port"),
    ("BITCOIN_RPC_URL", "bitcoin_rpc.url"),
    ("BITCOIN_RPC_USERNAME", "bitcoin_rpc.username"),
    ("BITCOIN_RPC_PASSWORD", "bitcoin_rpc.password"),
    ("AUGUR_DATA_DIR", "persistence.data_directory"),
    ("AUGUR_RETENTION_DAYS", "persistence.retention_days"),
    ("AUGUR_RETENTION_MODE", "persistence.retention_mode"),
    ("AUGUR_COLLECTION_INTERVAL_MS", "collector.interval_ms"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BitcoinRpcConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl Default for BitcoinRpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8332".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Which trigger drives retention sweeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    /// A dedicated periodic task.
    #[default]
    Scheduled,
    /// At the end of every snapshot append.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Root of the date-partitioned snapshot tree.
    pub data_directory: PathBuf,
    /// Days of partitions to keep; zero or negative disables retention.
    pub retention_days: i64,
    pub retention_mode: RetentionMode,
    /// Sweep period in scheduled mode.
    pub retention_interval_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        let data_directory = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("augur");

        Self {
            data_directory,
            retention_days: DEFAULT_RETENTION_DAYS,
            retention_mode: RetentionMode::default(),
            retention_interval_secs: DEFAULT_RETENTION_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub interval_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_COLLECTION_INTERVAL_MS,
        }
    }
}

/// Top-level configuration for an Augur instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AugurConfig {
    pub server: ServerConfig,
    pub bitcoin_rpc: BitcoinRpcConfig,
    pub persistence: PersistenceConfig,
    pub collector: CollectorConfig,
}

impl AugurConfig {
    /// Load from the process environment.
    ///
    /// `config_file` takes precedence over `AUGUR_CONFIG_FILE`.
    pub fn load(config_file: Option<&Path>) -> Self {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup.
    pub fn load_with(config_file: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Self {
        let file = config_file
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_FILE_ENV).map(PathBuf::from));

        match Self::build(file.as_deref(), &env) {
            Ok(config) => return config,
            Err(e) => warn!("configuration invalid, ignoring overrides: {e}"),
        }
        if file.is_some() {
            match Self::build(None, &env) {
                Ok(config) => return config,
                Err(e) => warn!("configuration invalid without external file: {e}"),
            }
        }
        warn!("using built-in default configuration");
        Self::default()
    }

    /// Build and validate a configuration from the three layers.
    pub fn build(
        config_file: Option<&Path>,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::from_str(BUNDLED_DEFAULTS, FileFormat::Toml));
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }
        for &(var, key) in ENV_OVERRIDES {
            builder = builder
                .set_override_option(key, env(var))
                .map_err(|e| ConfigError::Load(e.to_string()))?;
        }

        let config: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.collector.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "collector.interval_ms".into(),
                message: "must be positive".into(),
            });
        }
        if self.persistence.retention_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "persistence.retention_interval_secs".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Socket address string for the HTTP server.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_millis(self.collector.interval_ms)
    }

    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.persistence.retention_interval_secs)
    }
}
