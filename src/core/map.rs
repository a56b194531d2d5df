use crate::core::geo::LatLng;
use crate::core::projection::{self, Zoom};
use crate::core::viewport::Viewport;
use crate::layers::marker::{Marker, Polyline};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One render request: where to look, how big, and what to draw on top.
///
/// Overlays are drawn in insertion order, lines first, so a later marker
/// always covers an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMap {
    pub center: LatLng,
    pub zoom: Zoom,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub lines: Vec<Polyline>,
}

impl StaticMap {
    /// Creates a request without overlays. Fails for zooms outside
    /// `0..=MAX_ZOOM`, empty sizes and centers beyond the Mercator range.
    pub fn new(center: LatLng, zoom: i64, width: u32, height: u32) -> Result<Self> {
        let viewport = Viewport::new(center, Zoom::new(zoom)?, width, height)?;
        Ok(Self::from_viewport(viewport))
    }

    pub fn from_viewport(viewport: Viewport) -> Self {
        Self {
            center: viewport.center,
            zoom: viewport.zoom,
            width: viewport.width,
            height: viewport.height,
            markers: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let map: Self = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_markers(mut self, markers: impl IntoIterator<Item = Marker>) -> Self {
        self.markers.extend(markers);
        self
    }

    pub fn with_line(mut self, line: Polyline) -> Self {
        self.lines.push(line);
        self
    }

    pub fn viewport(&self) -> Result<Viewport> {
        Viewport::new(self.center, self.zoom, self.width, self.height)
    }

    /// Checks the viewport and that every overlay point is projectable.
    /// Out-of-range overlay points are reported, never clamped.
    pub fn validate(&self) -> Result<()> {
        self.viewport()?;
        for marker in &self.markers {
            projection::to_tile(&marker.position, self.zoom)?;
        }
        for point in self.lines.iter().flat_map(|line| line.points.iter()) {
            projection::to_tile(point, self.zoom)?;
        }
        Ok(())
    }
}
