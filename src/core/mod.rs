pub mod config;
pub mod constants;
pub mod geo;
pub mod map;
pub mod projection;
pub mod viewport;

// Re-export the essential types
pub use config::{RenderConfig, RenderProfile, TileLoaderConfig};
pub use geo::{LatLng, Point, TileCoord};
pub use map::StaticMap;
pub use projection::{TilePosition, Zoom};
pub use viewport::Viewport;
