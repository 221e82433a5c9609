//! Level pyramid definition.

use super::Tile;
use crate::addressing::{self, TileRange};
use crate::coord::{MercatorSector, Sector};

/// Parameters describing a tile pyramid.
///
/// Level `n` has a tile delta of `level_zero_tile_delta / 2^n`. The latitude
/// delta is measured in Mercator degrees, i.e. `90` corresponds to one unit
/// of Mercator-y.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSetConfig {
    /// Human readable dataset name (also used in vendor URLs).
    pub dataset: String,
    /// Root directory name of the tiles inside the cache.
    pub cache_name: String,
    /// Service endpoint handed to the URL builder.
    pub service: String,
    /// File suffix including the dot, e.g. `.png`.
    pub format_suffix: String,
    pub num_levels: u32,
    /// Levels below this ordinal are placeholders that are never retrieved.
    pub num_empty_levels: u32,
    /// Tile delta at level 0 as `(lat, lon)` degrees.
    pub level_zero_tile_delta: (f64, f64),
    pub tile_width: u32,
    pub tile_height: u32,
    /// Geographic coverage of the pyramid.
    pub coverage: Sector,
}

impl Default for LevelSetConfig {
    fn default() -> Self {
        Self {
            dataset: "tiles".to_string(),
            cache_name: "tiles".to_string(),
            service: String::new(),
            format_suffix: ".png".to_string(),
            num_levels: 16,
            num_empty_levels: 0,
            level_zero_tile_delta: (22.5, 45.0),
            tile_width: 256,
            tile_height: 256,
            coverage: Sector::FULL_SPHERE,
        }
    }
}

/// One zoom level of the pyramid.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    number: u32,
    tile_delta_lat: f64,
    tile_delta_lon: f64,
    empty: bool,
    origin_y: f64,
    origin_lon: f64,
    num_rows: u32,
    num_cols: u32,
    tile_width: u32,
    tile_height: u32,
    service: String,
    dataset: String,
    cache_name: String,
    format_suffix: String,
}

impl Level {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Tile height in Mercator degrees.
    pub fn tile_delta_lat(&self) -> f64 {
        self.tile_delta_lat
    }

    /// Tile width in degrees of longitude.
    pub fn tile_delta_lon(&self) -> f64 {
        self.tile_delta_lon
    }

    /// Tile height in Mercator-y units.
    pub fn row_delta(&self) -> f64 {
        self.tile_delta_lat / 90.0
    }

    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    pub fn origin_lon(&self) -> f64 {
        self.origin_lon
    }

    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }

    pub fn num_cols(&self) -> u32 {
        self.num_cols
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn format_suffix(&self) -> &str {
        &self.format_suffix
    }

    /// Angular size of one texel in radians.
    pub fn texel_size(&self) -> f64 {
        self.tile_delta_lat.to_radians() / self.tile_height as f64
    }

    /// Cache directory holding every tile of this level.
    pub fn cache_dir(&self) -> String {
        format!("{}/{}", self.cache_name, self.number)
    }

    /// Cache key of a tile: `{cache_name}/{level}/{row}/{row}_{col}{suffix}`.
    pub fn cache_key(&self, tile: &Tile) -> String {
        format!(
            "{}/{}/{}/{}_{}{}",
            self.cache_name, self.number, tile.row, tile.row, tile.col, self.format_suffix
        )
    }

    /// Mercator footprint of a tile on this level.
    pub fn footprint(&self, tile: &Tile) -> MercatorSector {
        let dy = self.row_delta();
        let min_y = self.origin_y + dy * tile.row as f64;
        let min_lon = self.origin_lon + self.tile_delta_lon * tile.col as f64;
        MercatorSector::new(min_y, min_y + dy, min_lon, min_lon + self.tile_delta_lon)
    }

    /// Tile range covering a Mercator sector on this level.
    pub fn tile_range(&self, sector: &MercatorSector) -> TileRange {
        addressing::tile_range(self, sector)
    }
}

/// The ordered collection of levels of one layer.
#[derive(Debug, Clone)]
pub struct LevelSet {
    levels: Vec<Level>,
    config: LevelSetConfig,
}

impl LevelSet {
    /// Builds the pyramid from its configuration.
    pub fn new(config: LevelSetConfig) -> Self {
        let coverage = MercatorSector::from_sector(&config.coverage);
        let (delta_lat0, delta_lon0) = config.level_zero_tile_delta;

        let levels = (0..config.num_levels)
            .map(|number| {
                let scale = 2f64.powi(number as i32);
                let tile_delta_lat = delta_lat0 / scale;
                let tile_delta_lon = delta_lon0 / scale;
                let row_delta = tile_delta_lat / 90.0;
                Level {
                    number,
                    tile_delta_lat,
                    tile_delta_lon,
                    empty: number < config.num_empty_levels,
                    origin_y: coverage.min_y(),
                    origin_lon: coverage.min_lon(),
                    num_rows: grid_size(coverage.delta_y(), row_delta),
                    num_cols: grid_size(coverage.delta_lon(), tile_delta_lon),
                    tile_width: config.tile_width,
                    tile_height: config.tile_height,
                    service: config.service.clone(),
                    dataset: config.dataset.clone(),
                    cache_name: config.cache_name.clone(),
                    format_suffix: config.format_suffix.clone(),
                }
            })
            .collect();

        Self { levels, config }
    }

    pub fn config(&self) -> &LevelSetConfig {
        &self.config
    }

    pub fn coverage(&self) -> &Sector {
        &self.config.coverage
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn num_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn level(&self, number: u32) -> Option<&Level> {
        self.levels.get(number as usize)
    }

    pub fn last_level(&self) -> Option<&Level> {
        self.levels.last()
    }

    pub fn first_non_empty_level(&self) -> Option<&Level> {
        self.levels.iter().find(|l| !l.is_empty())
    }

    /// Returns true for empty placeholder levels and for unknown ordinals.
    pub fn is_level_empty(&self, number: u32) -> bool {
        self.level(number).map_or(true, Level::is_empty)
    }

    /// Non-empty levels from the coarsest up to and including `target`.
    pub fn retrievable_levels(&self, target: u32) -> impl Iterator<Item = &Level> {
        self.levels
            .iter()
            .take_while(move |l| l.number() <= target)
            .filter(|l| !l.is_empty())
    }

    /// Number of tiles of `level` intersecting the sector (0 for unknown levels).
    pub fn tile_count(&self, sector: &MercatorSector, level: u32) -> u64 {
        self.level(level)
            .map_or(0, |l| l.tile_range(sector).count())
    }

    /// Tiles of `level` intersecting the sector in raster order.
    pub fn tiles_in_sector(&self, sector: &MercatorSector, level: u32) -> Vec<Tile> {
        self.level(level)
            .map(|l| l.tile_range(sector).iter().collect())
            .unwrap_or_default()
    }

    /// Picks the level whose texel size best matches a resolution in radians.
    ///
    /// The first non-empty level at least as fine as the requested resolution
    /// is chosen, then swapped for its coarser neighbour when that one is
    /// closer. Falls back to the last level when no level is fine enough.
    pub fn level_for_resolution(&self, resolution: f64) -> Option<&Level> {
        let last = self.last_level()?;
        let mut target = self
            .levels
            .iter()
            .take_while(|l| l.number() < last.number())
            .filter(|l| !l.is_empty())
            .find(|l| l.texel_size() <= resolution)
            .unwrap_or(last);

        if target.number() > 0 && !self.is_level_empty(target.number() - 1) {
            if let Some(coarser) = self.level(target.number() - 1) {
                let d_less = (coarser.texel_size() - resolution).abs();
                let d_more = (target.texel_size() - resolution).abs();
                if d_less < d_more {
                    target = coarser;
                }
            }
        }
        Some(target)
    }
}

fn grid_size(extent: f64, delta: f64) -> u32 {
    ((extent / delta).round() as u32).max(1)
}
