use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::transfer::WorkerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub transfers: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    pub sync_interval_ms: u64,
    pub settled_retention_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 30_000,
            settled_retention_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl TransferConfig {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            sync_interval: Duration::from_millis(self.sync_interval_ms),
            settled_retention: Duration::from_secs(self.settled_retention_secs),
        }
    }
}

impl AppConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(format!("config/{}.yaml", env))
    }
}
