//! RepairConfig - キュー / ワーカーの設定
//!
//! JSON ファイルから読み込み、未指定の項目はデフォルト値になります。
//! CLI フラグによる上書きは呼び出し側（datarepair-cli）で行います。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepairConfig {
    /// RocksDB directory backing the durable store.
    pub store_path: PathBuf,

    /// Number of repair workers for `work`.
    pub workers: usize,

    /// Sleep between polls while the queue is empty.
    pub idle_backoff_ms: u64,

    /// Default tracing filter (`RUST_LOG` still wins).
    pub log_filter: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("repair-queue"),
            workers: 1,
            idle_backoff_ms: 500,
            log_filter: "info".to_string(),
        }
    }
}

impl RepairConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_path must not be empty".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}
