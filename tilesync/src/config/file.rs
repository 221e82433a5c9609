//! Settings structs and loading/saving of the configuration file.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use ini::Ini;
use thiserror::Error;

use crate::bulk::BulkConfig;
use crate::estimate::PROGRESS_SAMPLES;
use crate::provider::{ProviderConfig, ProviderError};
use crate::region::MAX_TILES_PER_REGION;
use crate::retrieval::DEFAULT_CONCURRENCY;

pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PARALLEL_DOWNLOADS: usize = DEFAULT_CONCURRENCY;
/// Seconds without progress before the CLI restarts a run.
pub const DEFAULT_WATCHDOG_SECS: u64 = 300;
pub const DEFAULT_MAX_RESTARTS: u32 = 3;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// `google`, `tianditu`, `tencent`, `baidu` or `xyz`.
    pub provider_type: String,
    /// Vendor layer, or the URL template for `xyz`.
    pub layer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub directory: PathBuf,
    /// Tiles older than this many days are fetched again.
    pub expiry_days: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// Concurrent requests.
    pub parallel: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSettings {
    pub max_tiles_per_region: u64,
    pub poll_interval_ms: u64,
    pub progress_samples: usize,
    pub seed: Option<u64>,
    pub watchdog_secs: u64,
    pub max_restarts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub provider: ProviderSettings,
    pub cache: CacheSettings,
    pub download: DownloadSettings,
    pub bulk: BulkSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let dir = config_directory();
        Self {
            provider: ProviderSettings {
                provider_type: "google".to_string(),
                layer: None,
            },
            cache: CacheSettings {
                directory: dir.join("cache"),
                expiry_days: None,
            },
            download: DownloadSettings {
                timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
                parallel: DEFAULT_PARALLEL_DOWNLOADS,
            },
            bulk: BulkSettings {
                max_tiles_per_region: MAX_TILES_PER_REGION,
                poll_interval_ms: crate::bulk::DEFAULT_POLL_INTERVAL.as_millis() as u64,
                progress_samples: PROGRESS_SAMPLES,
                seed: None,
                watchdog_secs: DEFAULT_WATCHDOG_SECS,
                max_restarts: DEFAULT_MAX_RESTARTS,
            },
            logging: LoggingSettings {
                file: dir.join("tilesync.log"),
            },
        }
    }
}

impl ConfigFile {
    /// Loads from the default path, falling back to defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }
        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Writes a default file if none exists and returns its path.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    pub fn provider_config(&self) -> Result<ProviderConfig, ProviderError> {
        ProviderConfig::from_name(&self.provider.provider_type, self.provider.layer.as_deref())
    }

    pub fn bulk_config(&self) -> BulkConfig {
        let config = BulkConfig::default()
            .with_max_tiles_per_region(self.bulk.max_tiles_per_region)
            .with_progress_samples(self.bulk.progress_samples)
            .with_poll_interval(Duration::from_millis(self.bulk.poll_interval_ms));
        match self.bulk.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    /// Cut-off time before which cached tiles count as expired.
    pub fn expiry(&self) -> Option<SystemTime> {
        let days = self.cache.expiry_days?;
        SystemTime::now().checked_sub(Duration::from_secs(days.saturating_mul(86_400)))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download.timeout)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.bulk.watchdog_secs)
    }
}

/// `~/.tilesync`
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilesync")
}

/// `~/.tilesync/config.ini`
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
