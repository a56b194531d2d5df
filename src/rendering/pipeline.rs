//! The render call: plan, fetch, composite, crop, overlay.

use super::compositor;
use super::overlay::{self, ImageSurface, OverlayProjector};
use crate::core::config::RenderConfig;
use crate::core::geo::Point;
use crate::core::map::StaticMap;
use crate::prelude::{Arc, Duration, Instant};
use crate::tiles::cache::TileCache;
use crate::tiles::grid::TileGrid;
use crate::tiles::loader::{FallbackReason, HttpTileProvider, TileFetcher, TileProvider};
use crate::tiles::source::UrlTemplateSource;
use crate::{MapError, Result};
use image::RgbaImage;
use rusttype::Font;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// What happened to the tiles of one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Grid cells that map to a real tile (copies across the antimeridian
    /// counted separately).
    pub tiles_requested: usize,
    pub distinct_tiles: usize,
    pub fetched: usize,
    pub cache_hits: usize,
    /// Distinct tiles drawn as placeholders, whatever the reason.
    pub fallbacks: usize,
    pub timed_out: usize,
    pub deadline_missed: usize,
    /// Cells beyond the poles.
    pub empty_cells: usize,
    /// `(columns, rows)` of the tile grid.
    pub grid_size: (u32, u32),
    pub elapsed: Duration,
}

/// A finished raster of exactly the requested size.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub image: RgbaImage,
    /// Canvas pixel the image was cropped from.
    pub crop_origin: Point,
    pub stats: RenderStats,
}

impl RenderResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Writes the image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}

/// Renders [`StaticMap`] requests. Cheap to clone; clones share the tile
/// cache, so concurrent renders reuse each other's downloads.
#[derive(Clone)]
pub struct StaticMapRenderer {
    config: RenderConfig,
    fetcher: TileFetcher,
    font: Option<Arc<Font<'static>>>,
}

impl StaticMapRenderer {
    /// Renderer fetching tiles over HTTP from `config.tile_url_template`.
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let source = UrlTemplateSource::new(config.tile_url_template.as_str())
            .with_subdomains(config.subdomains.iter().cloned());
        let provider = HttpTileProvider::new(
            Arc::new(source),
            &config.user_agent,
            config.tile_loader.request_timeout(),
        )?;
        Self::with_provider(config, Arc::new(provider))
    }

    /// Renderer reading tiles from any [`TileProvider`].
    pub fn with_provider(config: RenderConfig, provider: Arc<dyn TileProvider>) -> Result<Self> {
        config.validate()?;
        let mut fetcher = TileFetcher::new(
            provider,
            config.tile_loader.clone(),
            config.fallback_color,
        );
        if let Some(capacity) = config.cache_capacity {
            fetcher = fetcher.with_cache(TileCache::new(capacity));
        }

        Ok(Self {
            config,
            fetcher,
            font: None,
        })
    }

    /// Replace the tile cache, e.g. to share one between renderers.
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.fetcher = self.fetcher.with_cache(cache);
        self
    }

    /// Font used for label text. Without one, only label boxes are drawn.
    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(Arc::new(font));
        self
    }

    /// Load the label font from TrueType/OpenType bytes.
    pub fn with_font_bytes(self, bytes: Vec<u8>) -> Result<Self> {
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| MapError::Config("font data could not be parsed".into()))?;
        Ok(self.with_font(font))
    }

    pub fn cache(&self) -> Option<&TileCache> {
        self.fetcher.cache()
    }

    /// Renders `map`, waiting for every tile to resolve or fall back.
    pub async fn render(&self, map: &StaticMap) -> Result<RenderResult> {
        self.render_with_cancel(map, CancellationToken::new()).await
    }

    /// Like [`render`](Self::render), but abandons the render when `cancel`
    /// fires. An abandoned render returns [`MapError::RenderAbandoned`], never
    /// a partial image.
    pub async fn render_with_cancel(
        &self,
        map: &StaticMap,
        cancel: CancellationToken,
    ) -> Result<RenderResult> {
        let started = Instant::now();
        map.validate()?;
        let viewport = map.viewport()?;
        let grid = TileGrid::plan(&viewport.center, viewport.zoom, viewport.width, viewport.height)?;

        let requested = grid.cells().filter(|(_, _, cell)| cell.coord().is_some()).count();
        let report = self
            .fetcher
            .fetch_grid(&grid, self.config.deadline(), &cancel)
            .await;

        if report.cancelled {
            return Err(MapError::RenderAbandoned {
                resolved: report.resolved(),
                total: report.tiles.len(),
            });
        }

        let canvas = compositor::composite(&grid, &report.tiles, self.config.fallback_color);
        let cropped = compositor::crop(&canvas, &viewport)?;
        let mut image = cropped.image;

        let projector = OverlayProjector::new(&grid, cropped.origin);
        let mut surface = ImageSurface::new(&mut image).with_font(self.font.as_deref());
        overlay::draw_overlays(&mut surface, &projector, &map.lines, &map.markers)?;

        let stats = RenderStats {
            tiles_requested: requested,
            distinct_tiles: report.tiles.len(),
            fetched: report.fetched(),
            cache_hits: report.cache_hits(),
            fallbacks: report.fallbacks(),
            timed_out: report.with_reason(FallbackReason::TimedOut),
            deadline_missed: report.with_reason(FallbackReason::DeadlineExceeded),
            empty_cells: (grid.columns() * grid.rows()) as usize - requested,
            grid_size: (grid.columns(), grid.rows()),
            elapsed: started.elapsed(),
        };

        log::info!(
            "rendered {}x{} map at {} zoom {}: {} tiles ({} fetched, {} cached, {} fallback) in {:?}",
            viewport.width,
            viewport.height,
            viewport.center,
            viewport.zoom.level(),
            stats.distinct_tiles,
            stats.fetched,
            stats.cache_hits,
            stats.fallbacks,
            stats.elapsed
        );
        if let Some(cache) = self.fetcher.cache() {
            let cache = cache.stats();
            log::debug!(
                "tile cache: {} entries, {} hits, {} misses ({:.0}% hit rate)",
                cache.size,
                cache.hits,
                cache.misses,
                cache.hit_rate() * 100.0
            );
        }

        Ok(RenderResult {
            image,
            crop_origin: cropped.origin,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RenderProfile;
    use crate::core::geo::TileCoord;
    use async_trait::async_trait;

    struct NoTiles;

    #[async_trait]
    impl TileProvider for NoTiles {
        async fn fetch(&self, coord: TileCoord) -> Result<Vec<u8>> {
            Err(MapError::TileFetch(format!("no tile {}", coord)))
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = RenderConfig::default();
        config.tile_loader.max_concurrent = 0;
        assert!(matches!(
            StaticMapRenderer::with_provider(config, Arc::new(NoTiles)),
            Err(MapError::Config(_))
        ));
    }

    #[test]
    fn test_bad_font_bytes() {
        let renderer = StaticMapRenderer::with_provider(RenderConfig::default(), Arc::new(NoTiles))
            .unwrap();
        assert!(matches!(
            renderer.with_font_bytes(vec![0, 1, 2, 3]),
            Err(MapError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_stats_account_for_every_cell() {
        let renderer = StaticMapRenderer::with_provider(
            RenderProfile::Testing.resolve(),
            Arc::new(NoTiles),
        )
        .unwrap();
        let map = StaticMap::new(crate::LatLng::new(80.0, 0.0), 3, 300, 300).unwrap();
        let result = renderer.render(&map).await.unwrap();

        let stats = &result.stats;
        assert_eq!((result.width(), result.height()), (300, 300));
        assert_eq!(stats.grid_size, (4, 4));
        assert!(stats.empty_cells > 0);
        assert_eq!(
            stats.tiles_requested + stats.empty_cells,
            (stats.grid_size.0 * stats.grid_size.1) as usize
        );
        assert_eq!(stats.fallbacks, stats.distinct_tiles);
        assert_eq!(stats.fetched, 0);
    }
}
