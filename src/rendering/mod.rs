pub mod compositor;
pub mod overlay;
pub mod pipeline;

// Re-export main types
pub use compositor::{composite, crop, Canvas, Cropped};
pub use overlay::{draw_overlays, DrawingSurface, ImageSurface, OverlayProjector};
pub use pipeline::{RenderResult, RenderStats, StaticMapRenderer};
