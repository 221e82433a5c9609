//! Bulk scheduler tuning.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::estimate::PROGRESS_SAMPLES;
use crate::region::MAX_TILES_PER_REGION;

/// Default fallback wait between submission passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Tuning of a bulk run.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkConfig {
    /// Upper bound of tiles per scheduling region.
    pub max_tiles_per_region: u64,
    /// Regions sampled to seed the progress totals.
    pub progress_samples: usize,
    /// Longest wait before re-checking the retrieval service.
    pub poll_interval: Duration,
    /// Fixed seed for region sampling; random when `None`.
    pub seed: Option<u64>,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_tiles_per_region: MAX_TILES_PER_REGION,
            progress_samples: PROGRESS_SAMPLES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            seed: None,
        }
    }
}

impl BulkConfig {
    pub fn with_max_tiles_per_region(mut self, max: u64) -> Self {
        self.max_tiles_per_region = max;
        self
    }

    pub fn with_progress_samples(mut self, samples: usize) -> Self {
        self.progress_samples = samples;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Random source for region sampling.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
