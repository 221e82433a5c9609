//! Sector decomposition
//!
//! Splits a sector into a grid of regions so that no region holds more than a
//! bounded number of tiles on a given level. Grids built for a level are cut
//! on tile boundaries: each axis splits the sector's tile span into
//! contiguous index ranges, so regions never share a tile and the bound holds
//! for any sector, aligned or not.

use crate::addressing::{self, TileRange};
use crate::coord::MercatorSector;
use crate::level::Level;
use rand::Rng;

/// Maximum tiles per region when scheduling downloads.
pub const MAX_TILES_PER_REGION: u64 = 200;

/// Maximum tiles per region when sampling for estimates.
pub const MAX_TILES_PER_SAMPLE_REGION: u64 = 36;

/// Number of divisions per axis needed to keep every cell within `max_tiles`.
///
/// Starts from the uniform-density estimate `ceil(sqrt(total / max))` and
/// grows it until the largest cell fits, which matters for long, thin
/// sectors. At `max(rows, cols)` divisions every cell is a single tile, so
/// the loop always ends within the bound. `max_tiles == 0` is treated as 1.
pub fn compute_region_divisions(level: &Level, sector: &MercatorSector, max_tiles: u64) -> u32 {
    let max_tiles = max_tiles.max(1);
    let range = level.tile_range(sector);
    let total = range.count();
    if total <= max_tiles {
        return 1;
    }

    let mut divisions = ((total as f64 / max_tiles as f64).sqrt().ceil() as u32).max(1);
    let limit = range.rows().max(range.cols()) as u32;
    while divisions < limit && largest_cell(&range, divisions) > max_tiles {
        divisions += 1;
    }
    divisions
}

/// Tiles of the largest cell when `range` is split into `divisions` index
/// ranges per axis.
fn largest_cell(range: &TileRange, divisions: u32) -> u64 {
    let along = |span: u64| span.div_ceil(span.min(divisions as u64));
    along(range.rows()) * along(range.cols())
}

/// A grid of regions over a Mercator sector.
///
/// Cells are stored as ascending cut positions per axis; row 0 is the
/// southern strip.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGrid {
    sector: MercatorSector,
    divisions: u32,
    y_cuts: Vec<f64>,
    lon_cuts: Vec<f64>,
}

impl RegionGrid {
    /// Creates an evenly spaced `div × div` grid (at least 1).
    pub fn new(sector: MercatorSector, divisions: u32) -> Self {
        let divisions = divisions.max(1);
        Self {
            sector,
            divisions,
            y_cuts: even_cuts(sector.min_y(), sector.max_y(), divisions),
            lon_cuts: even_cuts(sector.min_lon(), sector.max_lon(), divisions),
        }
    }

    /// Creates the grid bounding each cell to `max_tiles` on `level`.
    ///
    /// Cuts fall on tile boundaries. An axis spanning fewer tiles than the
    /// division count is cut once per tile, so the grid may have fewer than
    /// `div²` cells.
    pub fn for_level(level: &Level, sector: MercatorSector, max_tiles: u64) -> Self {
        let divisions = compute_region_divisions(level, &sector, max_tiles);
        let range = level.tile_range(&sector);
        let y_cuts = aligned_cuts(
            sector.min_y(),
            sector.max_y(),
            range.min_row,
            range.rows(),
            divisions,
            level.origin_y(),
            level.row_delta(),
        );
        let lon_cuts = aligned_cuts(
            sector.min_lon(),
            sector.max_lon(),
            range.min_col,
            range.cols(),
            divisions,
            level.origin_lon(),
            level.tile_delta_lon(),
        );
        Self {
            sector,
            divisions,
            y_cuts,
            lon_cuts,
        }
    }

    pub fn sector(&self) -> &MercatorSector {
        &self.sector
    }

    /// Requested divisions per axis.
    pub fn divisions(&self) -> u32 {
        self.divisions
    }

    /// Grid rows (southern strip first).
    pub fn rows(&self) -> u32 {
        (self.y_cuts.len() - 1) as u32
    }

    pub fn cols(&self) -> u32 {
        (self.lon_cuts.len() - 1) as u32
    }

    /// Number of cells.
    pub fn len(&self) -> u64 {
        self.rows() as u64 * self.cols() as u64
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Cell at grid position `(row, col)`; row 0 is the southern strip.
    pub fn cell(&self, row: u32, col: u32) -> MercatorSector {
        let (row, col) = (row as usize, col as usize);
        MercatorSector::new(
            self.y_cuts[row],
            self.y_cuts[row + 1],
            self.lon_cuts[col],
            self.lon_cuts[col + 1],
        )
    }

    /// Cell by its row-major index.
    pub fn cell_at(&self, index: u64) -> MercatorSector {
        let cols = self.cols() as u64;
        self.cell((index / cols) as u32, (index % cols) as u32)
    }

    /// All cells in row-major order, southern strip first, west to east.
    pub fn iter(&self) -> impl Iterator<Item = MercatorSector> + '_ {
        (0..self.len()).map(move |index| self.cell_at(index))
    }

    /// Draws up to `n` distinct cells without replacement.
    ///
    /// When `n` covers the whole grid every cell is returned in sweep order.
    /// Sampled cells are returned in sweep order as well.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<MercatorSector> {
        let len = self.len();
        if n as u64 >= len {
            return self.iter().collect();
        }

        let mut indices = rand::seq::index::sample(rng, len as usize, n).into_vec();
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|index| self.cell_at(index as u64))
            .collect()
    }

    /// Largest tile count of any cell on `level`.
    pub fn max_cell_tiles(&self, level: &Level) -> u64 {
        let max_rows = self
            .y_cuts
            .windows(2)
            .map(|w| {
                let (lo, hi) = addressing::row_span(level, w[0], w[1]);
                (hi - lo) as u64 + 1
            })
            .max()
            .unwrap_or(0);
        let max_cols = self
            .lon_cuts
            .windows(2)
            .map(|w| {
                let (lo, hi) = addressing::col_span(level, w[0], w[1]);
                (hi - lo) as u64 + 1
            })
            .max()
            .unwrap_or(0);
        max_rows * max_cols
    }
}

fn even_cuts(min: f64, max: f64, divisions: u32) -> Vec<f64> {
    let step = (max - min) / divisions as f64;
    (0..=divisions)
        .map(|i| match i {
            0 => min,
            i if i == divisions => max,
            i => min + step * i as f64,
        })
        .collect()
}

/// Cut positions splitting `count` tiles starting at index `first` into at
/// most `divisions` contiguous, non-empty index ranges. The outer cuts are
/// the sector bounds; inner cuts sit on tile edges.
fn aligned_cuts(
    min: f64,
    max: f64,
    first: u32,
    count: u64,
    divisions: u32,
    origin: f64,
    delta: f64,
) -> Vec<f64> {
    let parts = count.min(divisions as u64).max(1);
    let mut cuts = Vec::with_capacity(parts as usize + 1);
    cuts.push(min);
    for i in 1..parts {
        let index = first as u64 + i * count / parts;
        cuts.push(origin + delta * index as f64);
    }
    cuts.push(max);
    cuts
}
