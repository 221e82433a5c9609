//! Coverage estimation
//!
//! Estimates how many tiles of a request are still missing without probing
//! every tile: a handful of small regions at the target level are sampled and
//! their missing ratio is extrapolated to the total tile count of all levels.

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bulk::BulkError;
use crate::coord::MercatorSector;
use crate::probe::MissingTileProbe;
use crate::region::{RegionGrid, MAX_TILES_PER_SAMPLE_REGION};

/// Samples used to seed progress totals when a bulk run starts.
pub const PROGRESS_SAMPLES: usize = 50;

/// Samples used for the quick data-size estimate.
pub const SIZE_SAMPLES: usize = 6;

/// Result of one estimate, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageEstimate {
    /// Tiles across all non-empty levels up to the target level.
    pub total_tiles: u64,
    /// Tiles inspected in the sampled regions.
    pub sampled_tiles: u64,
    /// Missing tiles found in the sampled regions.
    pub sampled_missing: u64,
}

impl CoverageEstimate {
    /// Fraction of sampled tiles that were missing (0 when nothing was sampled).
    pub fn missing_ratio(&self) -> f64 {
        if self.sampled_tiles == 0 {
            0.0
        } else {
            self.sampled_missing as f64 / self.sampled_tiles as f64
        }
    }

    /// Extrapolated number of missing tiles, rounded to the nearest tile.
    pub fn missing_tiles(&self) -> u64 {
        (self.total_tiles as f64 * self.missing_ratio()).round() as u64
    }
}

/// Extrapolates missing-tile counts from sampled regions.
#[derive(Clone)]
pub struct CoverageEstimator {
    probe: MissingTileProbe,
}

impl CoverageEstimator {
    pub fn new(probe: MissingTileProbe) -> Self {
        Self { probe }
    }

    /// Estimates the missing tiles of `sector` across levels `0..=target_level`.
    ///
    /// When the sampling grid has fewer cells than `num_samples` the whole
    /// sector is probed instead.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        sector: &MercatorSector,
        target_level: u32,
        num_samples: usize,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<CoverageEstimate, BulkError> {
        let levels = self.probe.levels();
        let total_tiles: u64 = levels
            .retrievable_levels(target_level)
            .map(|level| level.tile_range(sector).count())
            .sum();

        let Some(level) = levels.level(target_level) else {
            return Ok(CoverageEstimate {
                total_tiles,
                sampled_tiles: 0,
                sampled_missing: 0,
            });
        };

        let grid = RegionGrid::for_level(level, *sector, MAX_TILES_PER_SAMPLE_REGION);
        let regions = if grid.len() < num_samples as u64 {
            vec![*sector]
        } else {
            grid.sample(num_samples, rng)
        };

        let mut sampled_tiles = 0;
        let mut sampled_missing = 0;
        for region in &regions {
            let (count, missing) = self.probe.count_missing(region, target_level, cancel)?;
            sampled_tiles += count;
            sampled_missing += missing;
        }

        let estimate = CoverageEstimate {
            total_tiles,
            sampled_tiles,
            sampled_missing,
        };
        debug!(
            total_tiles,
            sampled_regions = regions.len(),
            sampled_tiles,
            sampled_missing,
            estimate = estimate.missing_tiles(),
            "Coverage estimated"
        );
        Ok(estimate)
    }

    /// Convenience wrapper returning only the extrapolated missing count.
    pub fn estimate_missing<R: Rng + ?Sized>(
        &self,
        sector: &MercatorSector,
        target_level: u32,
        num_samples: usize,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<u64, BulkError> {
        Ok(self
            .estimate(sector, target_level, num_samples, rng, cancel)?
            .missing_tiles())
    }
}
