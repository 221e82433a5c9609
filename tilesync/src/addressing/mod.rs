//! Mercator tile addressing
//!
//! Maps a sector on a given level to the inclusive range of tile rows and
//! columns it touches. Rows are counted from the southern edge in Mercator-y
//! space; columns from the level origin longitude.
//!
//! The maximum edge of a range is half-open: a sector whose northern or
//! eastern bound lies exactly on a tile boundary does not include the tile
//! beyond it. Adjacent regions sharing an edge therefore never claim the same
//! tile. A small tolerance absorbs floating-point error from degree/Mercator
//! round trips.

use crate::coord::{MercatorSector, Sector};
use crate::level::{Level, Tile};

/// Tolerance, in tile units, applied when snapping bounds to the grid.
const EDGE_EPSILON: f64 = 1e-9;

/// Inclusive range of tiles on one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub level: u32,
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

impl TileRange {
    pub fn rows(&self) -> u64 {
        (self.max_row - self.min_row) as u64 + 1
    }

    pub fn cols(&self) -> u64 {
        (self.max_col - self.min_col) as u64 + 1
    }

    /// Number of tiles in the range.
    pub fn count(&self) -> u64 {
        self.rows() * self.cols()
    }

    pub fn contains(&self, tile: &Tile) -> bool {
        tile.level == self.level
            && (self.min_row..=self.max_row).contains(&tile.row)
            && (self.min_col..=self.max_col).contains(&tile.col)
    }

    /// Iterates tiles from the northern row to the southern row, west to east
    /// within a row.
    pub fn iter(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            row: Some(self.max_row),
            col: self.min_col,
        }
    }
}

impl IntoIterator for TileRange {
    type Item = Tile;
    type IntoIter = TileRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Raster-order iterator over a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    row: Option<u32>,
    col: u32,
}

impl Iterator for TileRangeIter {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let row = self.row?;
        let tile = Tile::new(self.range.level, row, self.col);

        if self.col < self.range.max_col {
            self.col += 1;
        } else {
            self.col = self.range.min_col;
            self.row = if row > self.range.min_row {
                Some(row - 1)
            } else {
                None
            };
        }
        Some(tile)
    }
}

/// Row span `[min, max]` of a Mercator-y interval on a level.
pub fn row_span(level: &Level, min_y: f64, max_y: f64) -> (u32, u32) {
    span(min_y, max_y, level.origin_y(), level.row_delta(), level.num_rows())
}

/// Column span `[min, max]` of a longitude interval on a level.
pub fn col_span(level: &Level, min_lon: f64, max_lon: f64) -> (u32, u32) {
    span(
        min_lon,
        max_lon,
        level.origin_lon(),
        level.tile_delta_lon(),
        level.num_cols(),
    )
}

/// Tile range covering a Mercator sector on a level.
pub fn tile_range(level: &Level, sector: &MercatorSector) -> TileRange {
    let (min_row, max_row) = row_span(level, sector.min_y(), sector.max_y());
    let (min_col, max_col) = col_span(level, sector.min_lon(), sector.max_lon());
    TileRange {
        level: level.number(),
        min_row,
        max_row,
        min_col,
        max_col,
    }
}

/// Tile range covering a geographic sector on a level.
///
/// Latitudes beyond the Web Mercator band are clamped before projection.
pub fn tile_range_for_sector(level: &Level, sector: &Sector) -> TileRange {
    tile_range(level, &MercatorSector::from_sector(sector))
}

fn span(min: f64, max: f64, origin: f64, delta: f64, count: u32) -> (u32, u32) {
    let last = count.saturating_sub(1) as i64;
    let lo = ((min - origin) / delta + EDGE_EPSILON).floor() as i64;
    let hi = ((max - origin) / delta - EDGE_EPSILON).ceil() as i64 - 1;
    let lo = lo.clamp(0, last);
    let hi = hi.clamp(lo, last);
    (lo as u32, hi as u32)
}
