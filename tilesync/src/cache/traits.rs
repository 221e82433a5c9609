//! Core traits for the tile cache.
//!
//! The scheduler only needs a narrow view of the cache: existence, expiry,
//! writing a payload and a size sample. Implementations are synchronous and
//! may block on I/O; the bulk scheduler calls them from tokio's blocking pool.

use std::path::PathBuf;
use std::time::SystemTime;

use thiserror::Error;

/// Errors that can occur during tile store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on a specific cache path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key cannot be mapped to a storage location.
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Key to bytes store holding cached tiles.
///
/// Keys are slash separated relative paths such as
/// `Google/Satellite/5/12/12_34.png`.
pub trait TileStore: Send + Sync {
    /// Returns true if an entry exists for the key.
    fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// Returns true if the entry was written before `expiry`.
    ///
    /// Missing entries and `expiry == None` are never expired.
    fn is_expired(&self, key: &str, expiry: Option<SystemTime>) -> Result<bool, StoreError>;

    /// Writes a payload, replacing any existing entry.
    fn store(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Average entry size below `dir`, sampling at most `max_subdirs`
    /// immediate subdirectories. `None` when nothing was found.
    fn average_file_size(&self, dir: &str, max_subdirs: usize) -> Result<Option<u64>, StoreError>;

    /// Returns true if the entry exists and is fresh.
    fn is_local(&self, key: &str, expiry: Option<SystemTime>) -> Result<bool, StoreError> {
        Ok(self.contains(key)? && !self.is_expired(key, expiry)?)
    }
}

/// Registry of tiles the remote service reported as not existing.
pub trait AbsentRegistry: Send + Sync {
    /// Returns true if the key is currently considered absent.
    fn is_absent(&self, key: &str) -> bool;

    /// Records a failed attempt for the key.
    fn mark_absent(&self, key: &str);

    /// Forgets any absence record for the key.
    fn unmark(&self, key: &str);
}
