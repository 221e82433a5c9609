//! Tianditu WMTS tile URLs.
//!
//! Tianditu publishes a Web Mercator (`w`) tile matrix set through a KVP
//! WMTS endpoint. Rows count from the north.

use super::types::{with_server, TileScheme, TileUrlBuilder};
use crate::level::{Level, Tile};

/// Tianditu layers and their WMTS layer identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiandituLayer {
    Imagery,
    Vector,
    Terrain,
}

impl TiandituLayer {
    pub fn code(&self) -> &'static str {
        match self {
            TiandituLayer::Imagery => "img",
            TiandituLayer::Vector => "vec",
            TiandituLayer::Terrain => "ter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "imagery" | "img" | "satellite" => Some(TiandituLayer::Imagery),
            "vector" | "vec" => Some(TiandituLayer::Vector),
            "terrain" | "ter" => Some(TiandituLayer::Terrain),
            _ => None,
        }
    }

    /// Endpoint for this layer, rotated across eight hosts.
    pub fn service(&self) -> String {
        format!("http://t{{s}}.tianditu.gov.cn/{}_w/wmts", self.code())
    }
}

/// URL builder for Tianditu tiles. The WMTS layer is the level dataset name.
#[derive(Debug, Clone)]
pub struct TiandituUrlBuilder {
    scheme: TileScheme,
}

impl TiandituUrlBuilder {
    pub fn new() -> Self {
        Self {
            scheme: TileScheme::XYZ,
        }
    }
}

impl Default for TiandituUrlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileUrlBuilder for TiandituUrlBuilder {
    fn name(&self) -> &str {
        "Tianditu"
    }

    fn build_url(&self, level: &Level, tile: &Tile) -> Option<String> {
        Some(format!(
            "{}?service=wmts&request=GetTile&version=1.0.0&LAYER={}&tileMatrixSet=w\
             &TileMatrix={}&TileRow={}&TileCol={}&style=default&format=tiles",
            with_server(level.service(), tile, 8),
            level.dataset(),
            self.scheme.zoom(level),
            self.scheme.row(level, tile),
            tile.col
        ))
    }
}
