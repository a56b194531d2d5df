use crate::core::constants::MAX_LATITUDE;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Whether the latitude can be represented by Web Mercator.
    pub fn is_projectable(&self) -> bool {
        self.is_valid() && self.lat.abs() < MAX_LATITUDE
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Represents a tile coordinate in the slippy map tile system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Number of tiles along one axis at this tile's zoom.
    pub fn world_size(&self) -> u32 {
        1u32 << self.z
    }

    /// Checks if the tile is valid for the given zoom level
    pub fn is_valid(&self) -> bool {
        let max_coord = self.world_size();
        self.x < max_coord && self.y < max_coord
    }

    /// Builds a coordinate from unbounded grid indices: `x` wraps around the
    /// antimeridian, `y` outside the world yields `None` (poles do not wrap).
    pub fn wrapped(x: i64, y: i64, z: u8) -> Option<Self> {
        let n = 1i64 << z;
        if y < 0 || y >= n {
            return None;
        }
        Some(Self::new(x.rem_euclid(n) as u32, y as u32, z))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
