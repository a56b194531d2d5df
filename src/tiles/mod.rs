pub mod cache;
pub mod grid;
pub mod loader;
pub mod source;

// Re-exports for convenience
pub use cache::{CacheStats, TileCache};
pub use grid::{GridCell, TileGrid};
pub use loader::{
    FallbackReason, FetchReport, HttpTileProvider, TileFetcher, TileImage, TileProvider,
    TileStatus,
};
pub use source::{OpenStreetMapSource, TileSource, UrlTemplateSource};
