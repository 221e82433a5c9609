//! Tiled layer
//!
//! A [`TiledLayer`] binds a level pyramid to the vendor that serves it and the
//! cache that stores it. It is the entry point for bulk operations: choosing
//! a level for a resolution, estimating missing data and spawning a bulk run
//! with [`TiledLayer::make_local`].

use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bulk::{BulkConfig, BulkError, BulkHandle, BulkRetrievalListener, BulkScheduler};
use crate::cache::{AbsentRegistry, TileStore};
use crate::coord::{MercatorSector, Sector};
use crate::estimate::{CoverageEstimator, SIZE_SAMPLES};
use crate::level::{Level, LevelSet};
use crate::probe::MissingTileProbe;
use crate::provider::{ProviderConfig, ProviderError, TileUrlBuilder};
use crate::retrieval::RetrievalService;

/// Tile size assumed when the cache holds nothing to sample.
pub const DEFAULT_AVERAGE_TILE_SIZE: u64 = 350_000;

/// Row directories sampled when measuring the average tile size.
pub const AVERAGE_SIZE_SAMPLE_DIRS: usize = 2;

/// A level pyramid bound to a URL builder, tile store and absent registry.
pub struct TiledLayer {
    name: String,
    levels: Arc<LevelSet>,
    url_builder: Arc<dyn TileUrlBuilder>,
    store: Arc<dyn TileStore>,
    absent: Arc<dyn AbsentRegistry>,
    expiry: Option<SystemTime>,
    average_tile_size: Mutex<Option<u64>>,
}

impl TiledLayer {
    pub fn new(
        name: impl Into<String>,
        levels: LevelSet,
        url_builder: Arc<dyn TileUrlBuilder>,
        store: Arc<dyn TileStore>,
        absent: Arc<dyn AbsentRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            levels: Arc::new(levels),
            url_builder,
            store,
            absent,
            expiry: None,
            average_tile_size: Mutex::new(None),
        }
    }

    /// Creates a layer for a vendor.
    pub fn from_provider(
        provider: &ProviderConfig,
        store: Arc<dyn TileStore>,
        absent: Arc<dyn AbsentRegistry>,
    ) -> Result<Self, ProviderError> {
        Ok(Self::new(
            provider.name(),
            LevelSet::new(provider.level_set_config()),
            provider.url_builder()?,
            store,
            absent,
        ))
    }

    /// Treats cached tiles written before `expiry` as missing.
    pub fn with_expiry(mut self, expiry: SystemTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &Arc<LevelSet> {
        &self.levels
    }

    pub fn url_builder(&self) -> &Arc<dyn TileUrlBuilder> {
        &self.url_builder
    }

    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }

    pub fn absent(&self) -> &Arc<dyn AbsentRegistry> {
        &self.absent
    }

    pub fn expiry(&self) -> Option<SystemTime> {
        self.expiry
    }

    pub fn probe(&self) -> MissingTileProbe {
        MissingTileProbe::new(
            Arc::clone(&self.levels),
            Arc::clone(&self.store),
            Arc::clone(&self.absent),
            self.expiry,
        )
    }

    pub fn estimator(&self) -> CoverageEstimator {
        CoverageEstimator::new(self.probe())
    }

    /// Level best matching a resolution in radians per texel.
    pub fn compute_level_for_resolution(&self, resolution: f64) -> Option<&Level> {
        self.levels.level_for_resolution(resolution)
    }

    /// Part of `sector` covered by this layer, or `None` if disjoint.
    pub fn local_sector(&self, sector: &Sector) -> Option<Sector> {
        sector.intersection(self.levels.coverage())
    }

    /// Average cached tile size in bytes.
    ///
    /// Measured once from up to two row directories of the first non-empty
    /// level and cached for the lifetime of the layer. Falls back to
    /// [`DEFAULT_AVERAGE_TILE_SIZE`] (not cached) when nothing can be sampled.
    pub fn average_tile_size(&self) -> u64 {
        let mut cached = self.average_tile_size.lock();
        if let Some(size) = *cached {
            return size;
        }

        let Some(level) = self.levels.first_non_empty_level() else {
            return DEFAULT_AVERAGE_TILE_SIZE;
        };
        match self
            .store
            .average_file_size(&level.cache_dir(), AVERAGE_SIZE_SAMPLE_DIRS)
        {
            Ok(Some(size)) if size > 0 => {
                debug!(layer = %self.name, size, "Measured average tile size");
                *cached = Some(size);
                size
            }
            Ok(_) => DEFAULT_AVERAGE_TILE_SIZE,
            Err(e) => {
                warn!(layer = %self.name, error = %e, "Failed to sample tile sizes");
                DEFAULT_AVERAGE_TILE_SIZE
            }
        }
    }

    /// Estimated bytes still missing to cover `sector` at `resolution`.
    ///
    /// Uses a quick six-region sample; returns 0 if the sector lies outside
    /// the layer.
    pub fn estimated_missing_data_size<R: Rng + ?Sized>(
        &self,
        sector: &Sector,
        resolution: f64,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<u64, BulkError> {
        let Some(target) = self.local_sector(sector) else {
            return Ok(0);
        };
        let Some(level) = self.compute_level_for_resolution(resolution) else {
            return Ok(0);
        };

        let missing = self.estimator().estimate_missing(
            &MercatorSector::from_sector(&target),
            level.number(),
            SIZE_SAMPLES,
            rng,
            cancel,
        )?;
        Ok(missing.saturating_mul(self.average_tile_size()))
    }

    /// Starts a bulk run bringing `sector` at `resolution` into the cache.
    ///
    /// The sector is first intersected with the layer coverage; `None` is
    /// returned when they are disjoint. Must be called within a tokio
    /// runtime.
    pub fn make_local(
        self: &Arc<Self>,
        sector: &Sector,
        resolution: f64,
        retrieval: Arc<dyn RetrievalService>,
        config: BulkConfig,
        listener: Option<Arc<dyn BulkRetrievalListener>>,
    ) -> Option<BulkHandle> {
        let target = self.local_sector(sector)?;
        let level = self.compute_level_for_resolution(resolution)?.number();

        info!(
            layer = %self.name,
            sector = %target,
            level,
            "Starting bulk retrieval"
        );

        let mut scheduler = BulkScheduler::new(Arc::clone(self), retrieval, &target, level, config);
        if let Some(listener) = listener {
            scheduler.add_listener(listener);
        }
        Some(scheduler.spawn(CancellationToken::new()))
    }
}
