//! Tile fetching with bounded concurrency, per-request timeouts and
//! fallback tiles.
//!
//! [`TileFetcher`] never fails visibly: every requested tile resolves to a
//! [`TileImage`], either decoded from the provider (or the cache) or a
//! solid-color placeholder of the same shape.

use super::cache::TileCache;
use super::grid::{GridCell, TileGrid};
use super::source::TileSource;
use crate::core::config::TileLoaderConfig;
use crate::core::constants::TILE_SIZE;
use crate::core::geo::TileCoord;
use crate::layers::marker::Color;
use crate::prelude::{Arc, Duration, HashMap, HashSet};
use crate::{MapError, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::RgbaImage;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Anything that can produce encoded image bytes for a tile.
///
/// Implementations report failures as errors; turning them into fallback
/// tiles is the fetcher's job.
#[async_trait]
pub trait TileProvider: Send + Sync {
    async fn fetch(&self, coord: TileCoord) -> Result<Vec<u8>>;
}

/// Fetches tiles over HTTP from a [`TileSource`].
pub struct HttpTileProvider {
    client: reqwest::Client,
    source: Arc<dyn TileSource>,
}

impl HttpTileProvider {
    pub fn new(
        source: Arc<dyn TileSource>,
        user_agent: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        // Public tile servers (e.g. OpenStreetMap) reject requests without a
        // User-Agent.
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .pool_max_idle_per_host(16)
            .build()?;
        Ok(Self { client, source })
    }
}

#[async_trait]
impl TileProvider for HttpTileProvider {
    async fn fetch(&self, coord: TileCoord) -> Result<Vec<u8>> {
        let url = self.source.url(coord);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(MapError::TileFetch(format!(
                "HTTP {} for tile {}",
                response.status(),
                coord
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Why a placeholder stands in for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The grid cell lies beyond the poles.
    NoTile,
    /// Network, HTTP status or decode failure.
    Failed,
    TimedOut,
    /// The render deadline passed before the tile resolved.
    DeadlineExceeded,
    Cancelled,
}

/// Where a tile's pixels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    Fetched,
    Cached,
    Fallback(FallbackReason),
}

/// A decoded `TILE_SIZE × TILE_SIZE` tile bound to its coordinate.
#[derive(Debug, Clone)]
pub struct TileImage {
    coord: Option<TileCoord>,
    image: Arc<RgbaImage>,
    status: TileStatus,
}

impl TileImage {
    fn new(coord: TileCoord, image: Arc<RgbaImage>, status: TileStatus) -> Self {
        Self {
            coord: Some(coord),
            image,
            status,
        }
    }

    /// Placeholder sharing `image`, which must already be tile-sized.
    fn fallback(coord: Option<TileCoord>, image: Arc<RgbaImage>, reason: FallbackReason) -> Self {
        Self {
            coord,
            image,
            status: TileStatus::Fallback(reason),
        }
    }

    /// Solid `color` placeholder.
    pub fn placeholder(coord: Option<TileCoord>, color: Color, reason: FallbackReason) -> Self {
        Self::fallback(coord, Arc::new(solid_tile(color)), reason)
    }

    pub fn coord(&self) -> Option<TileCoord> {
        self.coord
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn status(&self) -> TileStatus {
        self.status
    }
}

fn solid_tile(color: Color) -> RgbaImage {
    RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, color.into())
}

/// Decodes tile bytes, resizing non-standard tiles (e.g. 512px retina) so
/// the grid geometry stays exact.
pub fn decode_tile(bytes: &[u8]) -> Result<RgbaImage> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    if image.dimensions() == (TILE_SIZE, TILE_SIZE) {
        Ok(image)
    } else {
        Ok(image::imageops::resize(
            &image,
            TILE_SIZE,
            TILE_SIZE,
            FilterType::Triangle,
        ))
    }
}

/// Every tile of one batch, plus how the batch ended.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub tiles: HashMap<TileCoord, TileImage>,
    /// The cancellation token fired before every tile resolved.
    pub cancelled: bool,
}

impl FetchReport {
    fn count(&self, predicate: impl Fn(TileStatus) -> bool) -> usize {
        self.tiles
            .values()
            .filter(|tile| predicate(tile.status()))
            .count()
    }

    pub fn fetched(&self) -> usize {
        self.count(|status| status == TileStatus::Fetched)
    }

    pub fn cache_hits(&self) -> usize {
        self.count(|status| status == TileStatus::Cached)
    }

    pub fn fallbacks(&self) -> usize {
        self.count(|status| matches!(status, TileStatus::Fallback(_)))
    }

    pub fn with_reason(&self, reason: FallbackReason) -> usize {
        self.count(|status| status == TileStatus::Fallback(reason))
    }

    /// Tiles that actually resolved, as opposed to being abandoned.
    pub fn resolved(&self) -> usize {
        self.tiles.len()
            - self.with_reason(FallbackReason::Cancelled)
            - self.with_reason(FallbackReason::DeadlineExceeded)
    }
}

/// Resolves tile coordinates to images through an optional cache and a
/// [`TileProvider`]. Cheap to clone; clones share the provider and cache.
#[derive(Clone)]
pub struct TileFetcher {
    provider: Arc<dyn TileProvider>,
    cache: Option<TileCache>,
    config: TileLoaderConfig,
    fallback: Arc<RgbaImage>,
}

impl TileFetcher {
    pub fn new(
        provider: Arc<dyn TileProvider>,
        config: TileLoaderConfig,
        fallback_color: Color,
    ) -> Self {
        Self {
            provider,
            cache: None,
            config,
            fallback: Arc::new(solid_tile(fallback_color)),
        }
    }

    /// Layer a cache in front of the provider; the provider stays the miss path.
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&TileCache> {
        self.cache.as_ref()
    }

    /// Get configuration
    pub fn config(&self) -> &TileLoaderConfig {
        &self.config
    }

    fn placeholder(&self, coord: Option<TileCoord>, reason: FallbackReason) -> TileImage {
        TileImage::fallback(coord, Arc::clone(&self.fallback), reason)
    }

    /// Resolves one grid cell. Never fails.
    pub async fn fetch(&self, cell: GridCell) -> TileImage {
        match cell {
            GridCell::Tile(coord) => self.fetch_tile(coord).await,
            GridCell::Empty => self.placeholder(None, FallbackReason::NoTile),
        }
    }

    /// Resolves one tile: cache, then provider with timeout and retries,
    /// then placeholder.
    pub async fn fetch_tile(&self, coord: TileCoord) -> TileImage {
        if !coord.is_valid() {
            return self.placeholder(Some(coord), FallbackReason::NoTile);
        }

        if let Some(image) = self.cache.as_ref().and_then(|cache| cache.get(&coord)) {
            log::debug!("tile {} served from cache", coord);
            return TileImage::new(coord, image, TileStatus::Cached);
        }

        let attempts = self.config.max_retries + 1;
        let mut reason = FallbackReason::Failed;
        for attempt in 1..=attempts {
            log::debug!("fetch tile {} attempt {}", coord, attempt);
            let outcome =
                tokio::time::timeout(self.config.request_timeout(), self.provider.fetch(coord))
                    .await;

            match outcome {
                Ok(Ok(bytes)) => match decode_tile(&bytes) {
                    Ok(image) => {
                        log::debug!("downloaded tile {} ({} bytes)", coord, bytes.len());
                        let image = Arc::new(image);
                        if let Some(cache) = &self.cache {
                            cache.put(coord, Arc::clone(&image));
                        }
                        return TileImage::new(coord, image, TileStatus::Fetched);
                    }
                    Err(e) => {
                        // A server answering with garbage will keep doing so.
                        log::warn!("tile {} could not be decoded: {}", coord, e);
                        reason = FallbackReason::Failed;
                        break;
                    }
                },
                Ok(Err(e)) => {
                    log::warn!("tile {} download failed on attempt {}: {}", coord, attempt, e);
                    reason = FallbackReason::Failed;
                }
                Err(_) => {
                    log::warn!(
                        "tile {} timed out after {:?} on attempt {}",
                        coord,
                        self.config.request_timeout(),
                        attempt
                    );
                    reason = FallbackReason::TimedOut;
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay(attempt)).await;
            }
        }

        log::warn!("giving up on tile {}, using fallback", coord);
        self.placeholder(Some(coord), reason)
    }

    /// Fetches every tile of `grid`. See [`TileFetcher::fetch_all`].
    pub async fn fetch_grid(
        &self,
        grid: &TileGrid,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> FetchReport {
        self.fetch_all(&grid.distinct_tiles(), deadline, cancel).await
    }

    /// Fetches `coords` concurrently, at most `max_concurrent` in flight.
    ///
    /// Duplicate coordinates are fetched once. When `deadline` elapses or
    /// `cancel` fires, outstanding fetches are aborted and their tiles become
    /// placeholders; the report always holds one image per distinct coord.
    pub async fn fetch_all(
        &self,
        coords: &[TileCoord],
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> FetchReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut seen = HashSet::default();
        let distinct: Vec<TileCoord> = coords
            .iter()
            .copied()
            .filter(|coord| seen.insert(*coord))
            .collect();

        let mut tasks = JoinSet::new();
        for &coord in &distinct {
            let fetcher = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The semaphore is never closed; a failed acquire only
                // means the batch is being torn down.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return fetcher.placeholder(Some(coord), FallbackReason::Cancelled);
                };
                fetcher.fetch_tile(coord).await
            });
        }

        let deadline_elapsed = async {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => futures::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline_elapsed);

        let mut report = FetchReport::default();
        let mut unresolved = FallbackReason::Cancelled;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::warn!("tile batch cancelled with {} tasks outstanding", tasks.len());
                    report.cancelled = true;
                    break;
                }
                _ = &mut deadline_elapsed => {
                    log::warn!("tile deadline passed with {} tasks outstanding", tasks.len());
                    unresolved = FallbackReason::DeadlineExceeded;
                    break;
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(tile)) => {
                        if let Some(coord) = tile.coord() {
                            report.tiles.insert(coord, tile);
                        }
                    }
                    Some(Err(e)) => log::error!("tile task failed: {}", e),
                    None => break,
                },
            }
        }
        tasks.abort_all();

        for coord in distinct {
            if !report.tiles.contains_key(&coord) {
                let reason = if tasks.is_empty() {
                    // Only a panicked task leaves a gap after a full drain.
                    FallbackReason::Failed
                } else {
                    unresolved
                };
                report
                    .tiles
                    .insert(coord, self.placeholder(Some(coord), reason));
            }
        }

        report
    }
}
