//! Filesystem-backed tile store.
//!
//! Keys map directly to paths below a root directory. Writes go to a
//! temporary sibling first and are renamed into place, so a concurrent probe
//! never observes a partially written tile.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, trace};

use super::traits::{StoreError, TileStore};

/// Tile store rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct DiskTileStore {
    root: PathBuf,
}

impl DiskTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to its path, rejecting keys escaping the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn metadata(&self, key: &str) -> Result<Option<fs::Metadata>, StoreError> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

impl TileStore for DiskTileStore {
    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.metadata(key)?.is_some())
    }

    fn is_expired(&self, key: &str, expiry: Option<SystemTime>) -> Result<bool, StoreError> {
        let Some(expiry) = expiry else {
            return Ok(false);
        };
        let Some(meta) = self.metadata(key)? else {
            return Ok(false);
        };
        let modified = meta
            .modified()
            .map_err(|e| StoreError::io(self.root.join(key), e))?;
        Ok(modified < expiry)
    }

    fn store(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp = path.with_extension("part");
        fs::write(&tmp, data).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;

        trace!(key = key, bytes = data.len(), "Tile written");
        Ok(())
    }

    fn average_file_size(&self, dir: &str, max_subdirs: usize) -> Result<Option<u64>, StoreError> {
        let base = self.path_for(dir)?;
        let entries = match fs::read_dir(&base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(base, e)),
        };

        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();

        let mut total_bytes = 0u64;
        let mut count = 0u64;
        for subdir in subdirs.into_iter().take(max_subdirs) {
            let files = fs::read_dir(&subdir).map_err(|e| StoreError::io(&subdir, e))?;
            for file in files.filter_map(Result::ok) {
                if let Ok(meta) = file.metadata() {
                    if meta.is_file() {
                        total_bytes += meta.len();
                        count += 1;
                    }
                }
            }
        }

        debug!(dir = dir, files = count, bytes = total_bytes, "Sampled tile sizes");
        Ok((count > 0).then(|| total_bytes / count))
    }
}
