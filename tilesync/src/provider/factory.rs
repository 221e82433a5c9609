//! Provider factory.
//!
//! A [`ProviderConfig`] names a tile vendor and yields both the level-set
//! parameters of its pyramid (cache name, endpoint, level count) and the URL
//! builder that addresses its tiles.

use std::sync::Arc;

use super::baidu::{BaiduUrlBuilder, BAIDU_SERVICE};
use super::google::{GoogleLayer, GoogleUrlBuilder};
use super::tencent::{TencentUrlBuilder, TENCENT_SERVICE};
use super::tianditu::{TiandituLayer, TiandituUrlBuilder};
use super::types::{ProviderError, TileScheme, TileUrlBuilder};
use super::xyz::TemplateUrlBuilder;
use crate::level::LevelSetConfig;

/// Configuration for creating a provider.
///
/// # Example
///
/// ```
/// use tilesync::provider::{GoogleLayer, ProviderConfig};
///
/// let google = ProviderConfig::google(GoogleLayer::Satellite);
/// assert_eq!(google.name(), "Google");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// Google tiles (XYZ rows, 18 levels).
    Google { layer: GoogleLayer },

    /// Tianditu WMTS tiles (XYZ rows, 16 levels).
    Tianditu { layer: TiandituLayer },

    /// Tencent tiles (TMS rows, 16 levels).
    Tencent,

    /// Baidu tiles on Baidu's own projection (16 levels).
    Baidu,

    /// Any `{z}/{x}/{y}` template.
    Xyz {
        name: String,
        template: String,
        num_levels: u32,
        flip_rows: bool,
    },
}

impl ProviderConfig {
    pub fn google(layer: GoogleLayer) -> Self {
        Self::Google { layer }
    }

    pub fn tianditu(layer: TiandituLayer) -> Self {
        Self::Tianditu { layer }
    }

    pub fn tencent() -> Self {
        Self::Tencent
    }

    pub fn baidu() -> Self {
        Self::Baidu
    }

    /// XYZ template with north-origin rows and 18 levels (zoom 3 to 20).
    pub fn xyz(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::Xyz {
            name: name.into(),
            template: template.into(),
            num_levels: 18,
            flip_rows: true,
        }
    }

    /// Parses a provider from its name and optional layer.
    ///
    /// `xyz` requires a template passed as the layer argument.
    pub fn from_name(name: &str, layer: Option<&str>) -> Result<Self, ProviderError> {
        let unknown_layer = |provider: &str, layer: &str| ProviderError::UnknownLayer {
            provider: provider.to_string(),
            layer: layer.to_string(),
        };

        match name.to_ascii_lowercase().as_str() {
            "google" => {
                let layer = match layer {
                    Some(l) => GoogleLayer::from_name(l).ok_or_else(|| unknown_layer(name, l))?,
                    None => GoogleLayer::Satellite,
                };
                Ok(Self::google(layer))
            }
            "tianditu" => {
                let layer = match layer {
                    Some(l) => TiandituLayer::from_name(l).ok_or_else(|| unknown_layer(name, l))?,
                    None => TiandituLayer::Imagery,
                };
                Ok(Self::tianditu(layer))
            }
            "tencent" => Ok(Self::tencent()),
            "baidu" => Ok(Self::baidu()),
            "xyz" => {
                let template =
                    layer.ok_or_else(|| ProviderError::InvalidTemplate("missing".to_string()))?;
                Ok(Self::xyz("XYZ", template))
            }
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Google { .. } => "Google",
            Self::Tianditu { .. } => "Tianditu",
            Self::Tencent => "Tencent",
            Self::Baidu => "Baidu",
            Self::Xyz { name, .. } => name.as_str(),
        }
    }

    /// Level-set parameters of the vendor's pyramid.
    pub fn level_set_config(&self) -> LevelSetConfig {
        let base = LevelSetConfig::default();
        match self {
            Self::Google { layer } => LevelSetConfig {
                dataset: layer.name().to_string(),
                cache_name: format!("Google/{}", layer.name()),
                service: layer.service(),
                num_levels: 18,
                ..base
            },
            Self::Tianditu { layer } => LevelSetConfig {
                dataset: layer.code().to_string(),
                cache_name: format!("Tianditu/{}", layer.code()),
                service: layer.service(),
                num_levels: 16,
                format_suffix: ".jpg".to_string(),
                ..base
            },
            Self::Tencent => LevelSetConfig {
                dataset: "satellite".to_string(),
                cache_name: "Tencent/satellite".to_string(),
                service: TENCENT_SERVICE.to_string(),
                num_levels: 16,
                format_suffix: ".jpg".to_string(),
                ..base
            },
            Self::Baidu => LevelSetConfig {
                dataset: "onlinelabel".to_string(),
                cache_name: "Baidu/onlinelabel".to_string(),
                service: BAIDU_SERVICE.to_string(),
                num_levels: 16,
                level_zero_tile_delta: (45.0, 90.0),
                ..base
            },
            Self::Xyz {
                name, num_levels, ..
            } => LevelSetConfig {
                dataset: name.clone(),
                cache_name: format!("Xyz/{}", sanitize(name)),
                num_levels: *num_levels,
                ..base
            },
        }
    }

    /// Creates the URL builder for this vendor.
    pub fn url_builder(&self) -> Result<Arc<dyn TileUrlBuilder>, ProviderError> {
        Ok(match self {
            Self::Google { .. } => Arc::new(GoogleUrlBuilder::new()),
            Self::Tianditu { .. } => Arc::new(TiandituUrlBuilder::new()),
            Self::Tencent => Arc::new(TencentUrlBuilder::new()),
            Self::Baidu => Arc::new(BaiduUrlBuilder::new()),
            Self::Xyz {
                name,
                template,
                flip_rows,
                ..
            } => {
                let scheme = TileScheme {
                    zoom_offset: 3,
                    flip_rows: *flip_rows,
                };
                Arc::new(TemplateUrlBuilder::new(name.clone(), template.clone(), scheme)?)
            }
        })
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
