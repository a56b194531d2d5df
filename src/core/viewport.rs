use crate::core::constants::MAX_VIEWPORT_PIXELS;
use crate::core::geo::LatLng;
use crate::core::projection::{self, Zoom};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// The requested view: geographic center, zoom and output raster size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    pub zoom: Zoom,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

/// Rejects empty sizes and sizes above [`MAX_VIEWPORT_PIXELS`] on either axis.
pub(crate) fn check_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(MapError::InvalidViewport(format!(
            "size must be positive, got {}x{}",
            width, height
        )));
    }
    if width > MAX_VIEWPORT_PIXELS || height > MAX_VIEWPORT_PIXELS {
        return Err(MapError::InvalidViewport(format!(
            "size {}x{} exceeds the {} pixel limit per axis",
            width, height, MAX_VIEWPORT_PIXELS
        )));
    }
    Ok(())
}

impl Viewport {
    /// Creates a viewport, rejecting bad sizes and unprojectable centers.
    pub fn new(center: LatLng, zoom: Zoom, width: u32, height: u32) -> Result<Self> {
        check_size(width, height)?;
        // Surface range errors at construction rather than mid-render.
        projection::to_tile(&center, zoom)?;

        Ok(Self {
            center,
            zoom,
            width,
            height,
        })
    }
}
