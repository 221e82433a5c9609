//! In-memory tile store.
//!
//! Backed by a `DashMap` so completions from many retrieval tasks can write
//! concurrently. Used by tests and by dry runs that should not touch disk.

use std::time::SystemTime;

use bytes::Bytes;
use dashmap::DashMap;

use super::traits::{StoreError, TileStore};

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    written: SystemTime,
}

/// Concurrent in-memory tile store.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    entries: DashMap<String, Entry>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry with an explicit write time.
    pub fn insert_with_time(&self, key: &str, data: impl Into<Bytes>, written: SystemTime) {
        self.entries.insert(
            key.to_string(),
            Entry {
                data: data.into(),
                written,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).map(|e| e.data.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TileStore for MemoryTileStore {
    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.contains_key(key))
    }

    fn is_expired(&self, key: &str, expiry: Option<SystemTime>) -> Result<bool, StoreError> {
        Ok(match (expiry, self.entries.get(key)) {
            (Some(expiry), Some(entry)) => entry.written < expiry,
            _ => false,
        })
    }

    fn store(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.insert_with_time(key, Bytes::copy_from_slice(data), SystemTime::now());
        Ok(())
    }

    fn average_file_size(&self, dir: &str, max_subdirs: usize) -> Result<Option<u64>, StoreError> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));

        let mut subdirs: Vec<String> = self
            .entries
            .iter()
            .filter_map(|e| {
                let rest = e.key().strip_prefix(&prefix)?;
                let (subdir, _) = rest.split_once('/')?;
                Some(subdir.to_string())
            })
            .collect();
        subdirs.sort();
        subdirs.dedup();
        subdirs.truncate(max_subdirs);

        let (total, count) = self
            .entries
            .iter()
            .filter(|e| {
                e.key()
                    .strip_prefix(&prefix)
                    .and_then(|rest| rest.split_once('/'))
                    .is_some_and(|(subdir, _)| subdirs.iter().any(|s| s == subdir))
            })
            .fold((0u64, 0u64), |(total, count), e| {
                (total + e.data.len() as u64, count + 1)
            });

        Ok((count > 0).then(|| total / count))
    }
}
