//! Tencent tile URLs.
//!
//! Tencent numbers rows from the south like the level grid (TMS order), so
//! no row flip is applied.

use super::types::{with_server, TileScheme, TileUrlBuilder};
use crate::level::{Level, Tile};

/// Default Tencent satellite endpoint, rotated across four hosts.
pub const TENCENT_SERVICE: &str = "http://rt{s}.map.gtimg.com/tile";

#[derive(Debug, Clone)]
pub struct TencentUrlBuilder {
    scheme: TileScheme,
}

impl TencentUrlBuilder {
    pub fn new() -> Self {
        Self {
            scheme: TileScheme::TMS,
        }
    }
}

impl Default for TencentUrlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileUrlBuilder for TencentUrlBuilder {
    fn name(&self) -> &str {
        "Tencent"
    }

    fn build_url(&self, level: &Level, tile: &Tile) -> Option<String> {
        Some(format!(
            "{}?z={}&x={}&y={}&styleid=2&version=227",
            with_server(level.service(), tile, 4),
            self.scheme.zoom(level),
            tile.col,
            self.scheme.row(level, tile)
        ))
    }
}
