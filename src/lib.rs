//! # tilestitch
//!
//! Static raster map rendering for a geographic center, zoom level and pixel
//! size. Slippy-map tiles are fetched concurrently, stitched into a seamless
//! canvas, cropped to the requested viewport and overlaid with markers and
//! labels at their exact Web Mercator pixel positions.
//!
//! ```no_run
//! use tilestitch::prelude::*;
//!
//! # async fn run() -> tilestitch::Result<()> {
//! let map = StaticMap::new(LatLng::new(35.6762, 139.6503), 10, 800, 600)?
//!     .with_marker(Marker::new(LatLng::new(35.6762, 139.6503)).with_label("Tokyo"));
//!
//! let renderer = StaticMapRenderer::new(RenderConfig::default())?;
//! let result = renderer.render(&map).await?;
//! result.save("tokyo.png")?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{RenderConfig, RenderProfile, TileLoaderConfig},
    geo::{LatLng, Point, TileCoord},
    map::StaticMap,
    projection::{TilePosition, Zoom},
    viewport::Viewport,
};

pub use crate::layers::marker::{Color, Label, LabelAnchor, Marker, MarkerStyle, Polyline};

pub use crate::tiles::{
    cache::TileCache,
    grid::{GridCell, TileGrid},
    loader::{HttpTileProvider, TileFetcher, TileImage, TileProvider},
    source::{OpenStreetMapSource, TileSource, UrlTemplateSource},
};

pub use crate::rendering::{
    compositor::Canvas,
    overlay::{DrawingSurface, ImageSurface, OverlayProjector},
    pipeline::{RenderResult, RenderStats, StaticMapRenderer},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// Latitude outside the range Web Mercator can represent.
    #[error("latitude {lat} is outside the Web Mercator range (|lat| < {max})")]
    ProjectionRange { lat: f64, max: f64 },

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("zoom level {0} is outside 0..={max}", max = crate::constants::MAX_ZOOM)]
    InvalidZoom(i64),

    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),

    /// The planned grid cannot hold the requested crop. Indicates a planner
    /// defect, not a runtime condition.
    #[error(
        "tile grid {canvas_width}x{canvas_height}px cannot cover a {width}x{height}px crop at ({left}, {top})"
    )]
    InsufficientTileCoverage {
        canvas_width: u32,
        canvas_height: u32,
        width: u32,
        height: u32,
        left: i64,
        top: i64,
    },

    /// The caller cancelled the render before every tile resolved.
    #[error("render abandoned after {resolved} of {total} tiles resolved")]
    RenderAbandoned { resolved: usize, total: usize },

    /// Per-tile failure. Recovered inside the fetcher as a fallback tile.
    #[error("Tile fetch failed: {0}")]
    TileFetch(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Initialize `env_logger` from `RUST_LOG`. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
