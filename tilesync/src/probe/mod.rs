//! Missing-tile probe
//!
//! Enumerates the tiles of a region and keeps those that still need to be
//! fetched: neither present-and-fresh in the tile store nor marked absent.
//! Every tile check is a cancellation point.

use std::sync::Arc;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use crate::bulk::BulkError;
use crate::cache::{AbsentRegistry, TileStore};
use crate::coord::MercatorSector;
use crate::level::{Level, LevelSet, Tile};

/// Determines which tiles of a region are missing from the cache.
#[derive(Clone)]
pub struct MissingTileProbe {
    levels: Arc<LevelSet>,
    store: Arc<dyn TileStore>,
    absent: Arc<dyn AbsentRegistry>,
    expiry: Option<SystemTime>,
}

impl MissingTileProbe {
    /// Creates a probe.
    ///
    /// # Arguments
    ///
    /// * `levels` - Level pyramid used to enumerate tiles
    /// * `store` - Tile cache to check for existing entries
    /// * `absent` - Registry of tiles the remote service does not have
    /// * `expiry` - Entries written before this time count as missing
    pub fn new(
        levels: Arc<LevelSet>,
        store: Arc<dyn TileStore>,
        absent: Arc<dyn AbsentRegistry>,
        expiry: Option<SystemTime>,
    ) -> Self {
        Self {
            levels,
            store,
            absent,
            expiry,
        }
    }

    pub fn levels(&self) -> &Arc<LevelSet> {
        &self.levels
    }

    /// Returns true if the tile needs no retrieval: it is marked absent, or
    /// it is cached and not expired.
    pub fn is_local_or_absent(&self, level: &Level, tile: &Tile) -> Result<bool, BulkError> {
        let key = level.cache_key(tile);
        if self.absent.is_absent(&key) {
            return Ok(true);
        }
        Ok(self.store.is_local(&key, self.expiry)?)
    }

    /// Missing tiles of `region` on `level`, in raster order (north to south,
    /// west to east).
    ///
    /// # Errors
    ///
    /// Returns [`BulkError::Cancelled`] as soon as cancellation is observed
    /// and [`BulkError::Store`] if the cache cannot be queried.
    pub fn missing_tiles(
        &self,
        region: &MercatorSector,
        level: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Tile>, BulkError> {
        let Some(level) = self.levels.level(level) else {
            return Ok(Vec::new());
        };
        if level.is_empty() {
            return Ok(Vec::new());
        }

        let mut missing = Vec::new();
        for tile in level.tile_range(region).iter() {
            if cancel.is_cancelled() {
                return Err(BulkError::Cancelled);
            }
            if !self.is_local_or_absent(level, &tile)? {
                missing.push(tile);
            }
        }
        Ok(missing)
    }

    /// Number of tiles of `region` on `level` and how many of them are missing.
    pub fn count_missing(
        &self,
        region: &MercatorSector,
        level: u32,
        cancel: &CancellationToken,
    ) -> Result<(u64, u64), BulkError> {
        let total = self.levels.tile_count(region, level);
        let missing = self.missing_tiles(region, level, cancel)?.len() as u64;
        Ok((total, missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AbsentResourceList, MemoryTileStore};
    use crate::level::LevelSetConfig;
    use bytes::Bytes;
    use std::time::Duration;

    struct Fixture {
        levels: Arc<LevelSet>,
        store: Arc<MemoryTileStore>,
        absent: Arc<AbsentResourceList>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                levels: Arc::new(LevelSet::new(LevelSetConfig {
                    cache_name: "Probe".to_string(),
                    num_levels: 4,
                    num_empty_levels: 1,
                    ..Default::default()
                })),
                store: Arc::new(MemoryTileStore::new()),
                absent: Arc::new(AbsentResourceList::default()),
            }
        }

        fn probe(&self, expiry: Option<SystemTime>) -> MissingTileProbe {
            MissingTileProbe::new(
                Arc::clone(&self.levels),
                self.store.clone(),
                self.absent.clone(),
                expiry,
            )
        }

        fn key(&self, tile: &Tile) -> String {
            self.levels.level(tile.level).unwrap().cache_key(tile)
        }

        /// 3x3 tile block on level 2.
        fn region(&self) -> MercatorSector {
            let level = self.levels.level(2).unwrap();
            let sw = level.footprint(&Tile::new(2, 10, 20));
            let ne = level.footprint(&Tile::new(2, 12, 22));
            MercatorSector::new(sw.min_y(), ne.max_y(), sw.min_lon(), ne.max_lon())
        }
    }

    #[test]
    fn test_empty_cache_reports_all_tiles() {
        let fx = Fixture::new();
        let missing = fx
            .probe(None)
            .missing_tiles(&fx.region(), 2, &CancellationToken::new())
            .unwrap();
        assert_eq!(missing.len(), 9);
        assert_eq!(missing[0], Tile::new(2, 12, 20));
        assert_eq!(missing[8], Tile::new(2, 10, 22));
    }

    #[test]
    fn test_cached_and_absent_tiles_are_skipped() {
        let fx = Fixture::new();
        fx.store
            .store(&fx.key(&Tile::new(2, 11, 21)), b"png")
            .unwrap();
        fx.absent.mark_absent(&fx.key(&Tile::new(2, 10, 20)));

        let probe = fx.probe(None);
        let missing = probe
            .missing_tiles(&fx.region(), 2, &CancellationToken::new())
            .unwrap();
        assert_eq!(missing.len(), 7);
        assert!(!missing.contains(&Tile::new(2, 11, 21)));
        assert!(!missing.contains(&Tile::new(2, 10, 20)));

        // Idempotent on an unchanged cache
        let again = probe
            .missing_tiles(&fx.region(), 2, &CancellationToken::new())
            .unwrap();
        assert_eq!(missing, again);
    }

    #[test]
    fn test_expired_tiles_are_missing() {
        let fx = Fixture::new();
        let tile = Tile::new(2, 11, 21);
        let old = SystemTime::now() - Duration::from_secs(7200);
        fx.store
            .insert_with_time(&fx.key(&tile), Bytes::from_static(b"png"), old);

        let cutoff = SystemTime::now() - Duration::from_secs(60);
        let missing = fx
            .probe(Some(cutoff))
            .missing_tiles(&fx.region(), 2, &CancellationToken::new())
            .unwrap();
        assert!(missing.contains(&tile));
        assert_eq!(missing.len(), 9);
    }

    #[test]
    fn test_empty_level_has_nothing_missing() {
        let fx = Fixture::new();
        let missing = fx
            .probe(None)
            .missing_tiles(&MercatorSector::FULL, 0, &CancellationToken::new())
            .unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_cancellation_interrupts_probe() {
        let fx = Fixture::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fx.probe(None).missing_tiles(&fx.region(), 2, &cancel);
        assert!(matches!(result, Err(BulkError::Cancelled)));
    }

    #[test]
    fn test_count_missing() {
        let fx = Fixture::new();
        fx.store
            .store(&fx.key(&Tile::new(2, 12, 22)), b"png")
            .unwrap();
        let counts = fx
            .probe(None)
            .count_missing(&fx.region(), 2, &CancellationToken::new())
            .unwrap();
        assert_eq!(counts, (9, 8));
    }
}
