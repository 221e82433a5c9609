//! Tile identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile addressed by level ordinal, row and column.
///
/// Row 0 is the southernmost row of the level grid and column 0 starts at the
/// level origin longitude. Tiles compare by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub level: u32,
    pub row: u32,
    pub col: u32,
}

impl Tile {
    pub fn new(level: u32, row: u32, col: u32) -> Self {
        Self { level, row, col }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.row, self.col)
    }
}
