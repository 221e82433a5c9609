//! Level and tile index
//!
//! A [`LevelSet`] is the discrete pyramid of zoom levels of a layer; each
//! [`Level`] defines a regular tile grid in Mercator space. A [`Tile`] is the
//! value identity `(level, row, col)`; derived attributes (footprint, cache
//! key, pixel size) are resolved through its level.

mod set;
mod tile;

pub use set::{Level, LevelSet, LevelSetConfig};
pub use tile::Tile;
