//! Baidu tile URLs.
//!
//! Baidu uses its own planar projection approximated by piecewise
//! polynomials per latitude band, with 256-pixel tiles addressed from the
//! projection origin at zoom 18 resolution. Tiles are located from the
//! centroid of the level tile; nothing is served beyond ±74° latitude.

use super::types::TileUrlBuilder;
use crate::level::{Level, Tile};

/// Default Baidu endpoint.
pub const BAIDU_SERVICE: &str = "http://online0.map.bdimg.com/onlinelabel/";

/// Latitude limit of the Baidu projection (degrees).
pub const BAIDU_MAX_LAT: f64 = 74.0;

/// Lower latitude bound of each polynomial band.
const LAT_BANDS: [f64; 6] = [75.0, 60.0, 45.0, 30.0, 15.0, 0.0];

/// Forward projection coefficients per band.
const FORWARD_COEFFICIENTS: [[f64; 10]; 6] = [
    [
        -0.0015702102444,
        111320.7020616939,
        1704480524535203.0,
        -10338987376042340.0,
        26112667856603880.0,
        -35149669176653700.0,
        26595700718403920.0,
        -10725012454188240.0,
        1800819912950474.0,
        82.5,
    ],
    [
        0.0008277824516172526,
        111320.7020463578,
        647795574.6671607,
        -4082003173.641316,
        10774905663.51142,
        -15171875531.51559,
        12053065338.62167,
        -5124939663.577472,
        913311935.9512032,
        67.5,
    ],
    [
        0.00337398766765,
        111320.7020202162,
        4481351.045890365,
        -23393751.19931662,
        79682215.47186455,
        -115964993.2797253,
        97236711.15602145,
        -43661946.33752821,
        8477230.501135234,
        52.5,
    ],
    [
        0.00220636496208,
        111320.7020209128,
        51751.86112841131,
        3796837.749470245,
        992013.7397791013,
        -1221952.21711287,
        1340652.697009075,
        -620943.6990984312,
        144416.9293806241,
        37.5,
    ],
    [
        -0.0003441963504368392,
        111320.7020576856,
        278.2353980772752,
        2485758.690035394,
        6070.750963243378,
        54821.18345352118,
        9540.606633304236,
        -2710.55326746645,
        1405.483844121726,
        22.5,
    ],
    [
        -0.0003218135878613132,
        111320.7020701615,
        0.00369383431289,
        823725.6402795718,
        0.46104986909093,
        2351.343141331292,
        1.58060784298199,
        8.77738589078284,
        0.37238884252424,
        7.45,
    ],
];

/// Projects a WGS84 point onto the Baidu plane, returning `(x, y)` in meters.
pub fn to_baidu_mercator(lat: f64, lon: f64) -> (f64, f64) {
    let lat = lat.clamp(-BAIDU_MAX_LAT, BAIDU_MAX_LAT);
    let band = LAT_BANDS
        .iter()
        .position(|bound| lat.abs() >= *bound)
        .unwrap_or(LAT_BANDS.len() - 1);
    let c = &FORWARD_COEFFICIENTS[band];

    let x = (c[0] + c[1] * lon.abs()).copysign(lon);
    let t = lat.abs() / c[9];
    let y = c[2]
        + c[3] * t
        + c[4] * t.powi(2)
        + c[5] * t.powi(3)
        + c[6] * t.powi(4)
        + c[7] * t.powi(5)
        + c[8] * t.powi(6);
    (x, y.copysign(lat))
}

#[derive(Debug, Clone, Default)]
pub struct BaiduUrlBuilder;

impl BaiduUrlBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Baidu tile `(x, y, z)` containing the centroid of a level tile.
    pub fn baidu_tile(level: &Level, tile: &Tile) -> Option<(i64, i64, u32)> {
        let sector = level.footprint(tile).to_geographic();
        if sector.min_lat() > BAIDU_MAX_LAT || sector.min_lat() < -BAIDU_MAX_LAT {
            return None;
        }

        let (lat, lon) = sector.centroid();
        let (x, y) = to_baidu_mercator(lat, lon);
        let zoom = level.number() + 3;
        let tile_span = 2f64.powi(18 - zoom as i32) * 256.0;
        Some((tile_index(x, tile_span), tile_index(y, tile_span), zoom))
    }
}

/// Baidu tile index of a projected coordinate.
///
/// Baidu numbers tiles west and south of the origin from -1 downwards, so
/// indices are floored. Truncating toward zero would fold tile -1 onto tile 0
/// and leave the row and column next to the origin unreachable.
fn tile_index(meters: f64, tile_span: f64) -> i64 {
    (meters / tile_span).floor() as i64
}

impl TileUrlBuilder for BaiduUrlBuilder {
    fn name(&self) -> &str {
        "Baidu"
    }

    fn build_url(&self, level: &Level, tile: &Tile) -> Option<String> {
        let (x, y, z) = Self::baidu_tile(level, tile)?;
        Some(format!(
            "{}?qt=tile&x={}&y={}&z={}&styles=pl&udt=20170516&scaler=1&p=0",
            level.service(),
            x,
            y,
            z
        ))
    }
}
