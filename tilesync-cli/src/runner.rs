//! CLI runner for common setup.
//!
//! Loads the configuration, initializes logging and builds the layer and
//! retrieval pool the commands share.

use std::path::PathBuf;
use std::sync::Arc;

use tilesync::cache::{AbsentResourceList, DiskTileStore};
use tilesync::config::ConfigFile;
use tilesync::layer::TiledLayer;
use tilesync::logging::{init_logging, LoggingGuard};
use tilesync::provider::ProviderConfig;
use tilesync::retrieval::{PooledRetrievalService, ReqwestFetcher, DEFAULT_USER_AGENT};
use tracing::info;

use crate::error::CliError;

/// Manages the CLI lifecycle.
pub struct CliRunner {
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the config and starts logging.
    ///
    /// Console logging is disabled on a TTY so it does not corrupt the
    /// progress bar; the log file always receives everything.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let console = !atty::is(atty::Stream::Stderr);
        let logging_guard = init_logging(&config.logging.file, console)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(version = tilesync::VERSION, command, "TileSync starting");
    }

    /// Provider from CLI overrides or the config file.
    pub fn provider(
        &self,
        name: Option<&str>,
        layer: Option<&str>,
    ) -> Result<ProviderConfig, CliError> {
        match name {
            Some(name) => Ok(ProviderConfig::from_name(name, layer)?),
            None => {
                let mut settings = self.config.provider.clone();
                if let Some(layer) = layer {
                    settings.layer = Some(layer.to_string());
                }
                Ok(ProviderConfig::from_name(
                    &settings.provider_type,
                    settings.layer.as_deref(),
                )?)
            }
        }
    }

    /// Layer backed by the disk cache.
    pub fn layer(
        &self,
        provider: &ProviderConfig,
        cache_dir: Option<PathBuf>,
    ) -> Result<Arc<TiledLayer>, CliError> {
        let root = cache_dir.unwrap_or_else(|| self.config.cache.directory.clone());
        let layer = TiledLayer::from_provider(
            provider,
            Arc::new(DiskTileStore::new(&root)),
            Arc::new(AbsentResourceList::default()),
        )?;
        let layer = match self.config.expiry() {
            Some(expiry) => layer.with_expiry(expiry),
            None => layer,
        };

        info!(
            provider = provider.name(),
            cache = %root.display(),
            "Layer ready"
        );
        Ok(Arc::new(layer))
    }

    /// HTTP retrieval pool sized from `[download]`.
    pub fn retrieval(
        &self,
        parallel: Option<usize>,
    ) -> Result<Arc<PooledRetrievalService<ReqwestFetcher>>, CliError> {
        let fetcher = ReqwestFetcher::with_options(self.config.download_timeout(), DEFAULT_USER_AGENT)
            .map_err(CliError::HttpClient)?;
        let parallel = parallel.unwrap_or(self.config.download.parallel);
        Ok(Arc::new(PooledRetrievalService::new(fetcher, parallel)))
    }

    /// Multi-threaded tokio runtime for the async commands.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }
}
