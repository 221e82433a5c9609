//! Get and set configuration values by `section.key` name.

use std::str::FromStr;

use thiserror::Error;

use super::file::ConfigFile;
use super::parser::{expand_tilde, PROVIDERS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigKeyError {
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Settable configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ProviderType,
    ProviderLayer,
    CacheDirectory,
    CacheExpiryDays,
    DownloadTimeout,
    DownloadParallel,
    BulkMaxTilesPerRegion,
    BulkPollIntervalMs,
    BulkProgressSamples,
    BulkSeed,
    BulkWatchdogSecs,
    BulkMaxRestarts,
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s.to_lowercase())
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ProviderType,
            ConfigKey::ProviderLayer,
            ConfigKey::CacheDirectory,
            ConfigKey::CacheExpiryDays,
            ConfigKey::DownloadTimeout,
            ConfigKey::DownloadParallel,
            ConfigKey::BulkMaxTilesPerRegion,
            ConfigKey::BulkPollIntervalMs,
            ConfigKey::BulkProgressSamples,
            ConfigKey::BulkSeed,
            ConfigKey::BulkWatchdogSecs,
            ConfigKey::BulkMaxRestarts,
            ConfigKey::LoggingFile,
        ]
    }

    /// `section.key` form.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::ProviderType => "provider.type",
            ConfigKey::ProviderLayer => "provider.layer",
            ConfigKey::CacheDirectory => "cache.directory",
            ConfigKey::CacheExpiryDays => "cache.expiry_days",
            ConfigKey::DownloadTimeout => "download.timeout",
            ConfigKey::DownloadParallel => "download.parallel",
            ConfigKey::BulkMaxTilesPerRegion => "bulk.max_tiles_per_region",
            ConfigKey::BulkPollIntervalMs => "bulk.poll_interval_ms",
            ConfigKey::BulkProgressSamples => "bulk.progress_samples",
            ConfigKey::BulkSeed => "bulk.seed",
            ConfigKey::BulkWatchdogSecs => "bulk.watchdog_secs",
            ConfigKey::BulkMaxRestarts => "bulk.max_restarts",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Current value as a string; empty for unset optional values.
    pub fn get(&self, config: &ConfigFile) -> String {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        match self {
            ConfigKey::ProviderType => config.provider.provider_type.clone(),
            ConfigKey::ProviderLayer => opt(&config.provider.layer),
            ConfigKey::CacheDirectory => config.cache.directory.display().to_string(),
            ConfigKey::CacheExpiryDays => opt(&config.cache.expiry_days),
            ConfigKey::DownloadTimeout => config.download.timeout.to_string(),
            ConfigKey::DownloadParallel => config.download.parallel.to_string(),
            ConfigKey::BulkMaxTilesPerRegion => config.bulk.max_tiles_per_region.to_string(),
            ConfigKey::BulkPollIntervalMs => config.bulk.poll_interval_ms.to_string(),
            ConfigKey::BulkProgressSamples => config.bulk.progress_samples.to_string(),
            ConfigKey::BulkSeed => opt(&config.bulk.seed),
            ConfigKey::BulkWatchdogSecs => config.bulk.watchdog_secs.to_string(),
            ConfigKey::BulkMaxRestarts => config.bulk.max_restarts.to_string(),
            ConfigKey::LoggingFile => config.logging.file.display().to_string(),
        }
    }

    /// Validates and applies a value. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        let value = value.trim();
        match self {
            ConfigKey::ProviderType => {
                let v = value.to_lowercase();
                if !PROVIDERS.contains(&v.as_str()) {
                    return Err(self.invalid("must be one of: google, tianditu, tencent, baidu, xyz"));
                }
                config.provider.provider_type = v;
            }
            ConfigKey::ProviderLayer => {
                config.provider.layer = (!value.is_empty()).then(|| value.to_string());
            }
            ConfigKey::CacheDirectory => config.cache.directory = self.path(value)?,
            ConfigKey::CacheExpiryDays => config.cache.expiry_days = self.optional(value)?,
            ConfigKey::DownloadTimeout => config.download.timeout = self.positive(value)?,
            ConfigKey::DownloadParallel => config.download.parallel = self.positive(value)?,
            ConfigKey::BulkMaxTilesPerRegion => {
                config.bulk.max_tiles_per_region = self.positive(value)?
            }
            ConfigKey::BulkPollIntervalMs => config.bulk.poll_interval_ms = self.positive(value)?,
            ConfigKey::BulkProgressSamples => config.bulk.progress_samples = self.number(value)?,
            ConfigKey::BulkSeed => config.bulk.seed = self.optional(value)?,
            ConfigKey::BulkWatchdogSecs => config.bulk.watchdog_secs = self.number(value)?,
            ConfigKey::BulkMaxRestarts => config.bulk.max_restarts = self.number(value)?,
            ConfigKey::LoggingFile => config.logging.file = self.path(value)?,
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> ConfigKeyError {
        ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason: reason.to_string(),
        }
    }

    fn number<T: FromStr>(&self, value: &str) -> Result<T, ConfigKeyError> {
        value
            .parse()
            .map_err(|_| self.invalid("must be a non-negative integer"))
    }

    fn positive<T: FromStr + PartialEq + Default>(&self, value: &str) -> Result<T, ConfigKeyError> {
        let parsed: T = self.number(value)?;
        if parsed == T::default() {
            return Err(self.invalid("must be greater than zero"));
        }
        Ok(parsed)
    }

    fn optional<T: FromStr>(&self, value: &str) -> Result<Option<T>, ConfigKeyError> {
        if value.is_empty() {
            Ok(None)
        } else {
            self.number(value).map(Some)
        }
    }

    fn path(&self, value: &str) -> Result<std::path::PathBuf, ConfigKeyError> {
        if value.is_empty() {
            return Err(self.invalid("path must not be empty"));
        }
        Ok(expand_tilde(value))
    }
}
