//! Generic URL template provider.
//!
//! Templates use `{z}`, `{x}`, `{y}` and optionally `{s}` placeholders, e.g.
//! `https://tile.openstreetmap.org/{z}/{x}/{y}.png`. Row flipping and zoom
//! offset come from the [`TileScheme`].

use super::types::{with_server, ProviderError, TileScheme, TileUrlBuilder};
use crate::level::{Level, Tile};

#[derive(Debug, Clone)]
pub struct TemplateUrlBuilder {
    name: String,
    template: String,
    scheme: TileScheme,
    servers: u32,
}

impl TemplateUrlBuilder {
    /// Creates a template builder.
    ///
    /// # Errors
    ///
    /// Returns an error if any of `{z}`, `{x}` or `{y}` is missing.
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        scheme: TileScheme,
    ) -> Result<Self, ProviderError> {
        let template = template.into();
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(ProviderError::InvalidTemplate(format!(
                    "{} is missing {}",
                    template, placeholder
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            template,
            scheme,
            servers: 4,
        })
    }

    /// Sets how many hosts the `{s}` placeholder rotates across.
    pub fn with_servers(mut self, servers: u32) -> Self {
        self.servers = servers;
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileUrlBuilder for TemplateUrlBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_url(&self, level: &Level, tile: &Tile) -> Option<String> {
        let url = with_server(&self.template, tile, self.servers)
            .replace("{z}", &self.scheme.zoom(level).to_string())
            .replace("{x}", &tile.col.to_string())
            .replace("{y}", &self.scheme.row(level, tile).to_string());
        Some(url)
    }
}
