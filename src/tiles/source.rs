use crate::core::constants::DEFAULT_TILE_URL;
use crate::core::geo::TileCoord;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Tile source described by a URL template.
///
/// A template containing `{z}`, `{x}` and `{y}` is expanded as-is (`{s}` picks
/// a subdomain). Anything else is treated as a base URL and tiles are read
/// from `{base}/{z}/{x}/{y}.png`.
#[derive(Debug, Clone)]
pub struct UrlTemplateSource {
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let template = if template.contains("{z}") {
            template
        } else {
            format!("{}/{{z}}/{{x}}/{{y}}.png", template.trim_end_matches('/'))
        };
        Self {
            template,
            subdomains: Vec::new(),
        }
    }

    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }
}

impl TileSource for UrlTemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());

        if url.contains("{s}") {
            // Guard against empty subdomain list (config validation rejects it)
            let sub = if self.subdomains.is_empty() {
                ""
            } else {
                let idx = ((coord.x as usize) + (coord.y as usize)) % self.subdomains.len();
                self.subdomains[idx].as_str()
            };
            url = url.replace("{s}", sub);
        }
        url
    }
}

/// Simple implementation that hits the default OpenStreetMap tile server.
#[derive(Debug, Clone)]
pub struct OpenStreetMapSource {
    inner: UrlTemplateSource,
}

impl OpenStreetMapSource {
    pub fn new() -> Self {
        Self {
            inner: UrlTemplateSource::new(DEFAULT_TILE_URL),
        }
    }
}

impl Default for OpenStreetMapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, coord: TileCoord) -> String {
        self.inner.url(coord)
    }
}
