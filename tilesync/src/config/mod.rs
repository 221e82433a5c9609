//! User configuration (`~/.tilesync/config.ini`).
//!
//! ```ini
//! [provider]
//! type = google
//! layer = satellite
//!
//! [cache]
//! directory = ~/.tilesync/cache
//!
//! [download]
//! timeout = 30
//! parallel = 8
//!
//! [bulk]
//! max_tiles_per_region = 200
//! poll_interval_ms = 1000
//! progress_samples = 50
//! watchdog_secs = 300
//! max_restarts = 3
//!
//! [logging]
//! file = ~/.tilesync/tilesync.log
//! ```

mod file;
mod keys;
mod parser;
mod size;
mod writer;

pub use file::{
    config_directory, config_file_path, BulkSettings, CacheSettings, ConfigFile, ConfigFileError,
    DownloadSettings, LoggingSettings, ProviderSettings, DEFAULT_DOWNLOAD_TIMEOUT_SECS,
    DEFAULT_MAX_RESTARTS, DEFAULT_PARALLEL_DOWNLOADS, DEFAULT_WATCHDOG_SECS,
};
pub use keys::{ConfigKey, ConfigKeyError};
pub use size::{format_size, parse_size, SizeParseError};
