//! URL builder contract and shared tile scheme helpers.

use thiserror::Error;

use crate::level::{Level, Tile};

/// Errors from provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown layer '{layer}' for provider {provider}")]
    UnknownLayer { provider: String, layer: String },

    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),
}

/// Builds the remote URL of a tile.
///
/// Returning `None` means the vendor has no resource for this tile (for
/// example outside its projection band); the scheduler records the tile as
/// failed for the current run.
pub trait TileUrlBuilder: Send + Sync {
    /// Returns the display name of the vendor.
    fn name(&self) -> &str;

    /// Returns the URL of `tile` on `level`, if it has one.
    fn build_url(&self, level: &Level, tile: &Tile) -> Option<String>;
}

/// How a vendor numbers zoom levels and rows relative to the level grid.
///
/// The level grid counts rows from the south. XYZ-style vendors count from
/// the north, so their rows are flipped; their zoom is usually the level
/// ordinal plus a fixed offset (3 when level 0 is an 8×8 grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileScheme {
    pub zoom_offset: u32,
    pub flip_rows: bool,
}

impl TileScheme {
    /// Rows counted from the north, level 0 equals zoom 3.
    pub const XYZ: TileScheme = TileScheme {
        zoom_offset: 3,
        flip_rows: true,
    };

    /// Rows counted from the south, level 0 equals zoom 3.
    pub const TMS: TileScheme = TileScheme {
        zoom_offset: 3,
        flip_rows: false,
    };

    pub fn zoom(&self, level: &Level) -> u32 {
        level.number() + self.zoom_offset
    }

    pub fn row(&self, level: &Level, tile: &Tile) -> u32 {
        if self.flip_rows {
            level.num_rows().saturating_sub(1).saturating_sub(tile.row)
        } else {
            tile.row
        }
    }
}

/// Replaces a `{s}` placeholder with a server index derived from the tile.
///
/// Spreading neighbouring tiles across servers keeps each host's load even
/// and makes URLs deterministic.
pub fn with_server(template: &str, tile: &Tile, servers: u32) -> String {
    if servers == 0 || !template.contains("{s}") {
        return template.to_string();
    }
    let server = (tile.row + tile.col) % servers;
    template.replace("{s}", &server.to_string())
}
