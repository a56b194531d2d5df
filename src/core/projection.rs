//! Web Mercator projection between geographic coordinates, tile indices and
//! tile-local pixels.
//!
//! All functions are pure. Zoom is carried by the validated [`Zoom`] type, so
//! a projection call can only fail on its geographic input.

use crate::core::constants::{MAX_LATITUDE, MAX_ZOOM, TILE_SIZE};
use crate::core::geo::{LatLng, Point, TileCoord};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A zoom level in `0..=MAX_ZOOM`. The tile grid at zoom `z` is `2^z × 2^z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Zoom(u8);

impl Zoom {
    pub fn new(level: i64) -> Result<Self> {
        if (0..=MAX_ZOOM as i64).contains(&level) {
            Ok(Self(level as u8))
        } else {
            Err(MapError::InvalidZoom(level))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Number of tiles along one axis.
    pub fn tile_count(self) -> u32 {
        1u32 << self.0
    }

    /// Width of the whole world in pixels.
    pub fn world_pixels(self) -> f64 {
        self.tile_count() as f64 * TILE_SIZE as f64
    }
}

impl TryFrom<i64> for Zoom {
    type Error = MapError;

    fn try_from(level: i64) -> Result<Self> {
        Self::new(level)
    }
}

impl From<Zoom> for u8 {
    fn from(zoom: Zoom) -> u8 {
        zoom.0
    }
}

/// Location of a geographic point in the tile scheme: the containing tile and
/// the sub-tile pixel offset from that tile's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePosition {
    pub tile: TileCoord,
    /// Offset inside the tile, each axis in `[0, TILE_SIZE)`.
    pub pixel: Point,
}

/// Projects `point` at `zoom` into fractional tile units, before flooring.
fn fractional_tile(point: &LatLng, zoom: Zoom) -> Result<(f64, f64)> {
    if point.lat.is_nan() || point.lng.is_nan() || !point.is_valid() {
        return Err(MapError::InvalidCoordinates(format!(
            "{} is not a valid latitude/longitude",
            point
        )));
    }
    if !point.is_projectable() {
        return Err(MapError::ProjectionRange {
            lat: point.lat,
            max: MAX_LATITUDE,
        });
    }

    let n = zoom.tile_count() as f64;
    let lat_rad = point.lat.to_radians();
    let x = (point.lng + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    Ok((x, y))
}

/// Forward Web Mercator: the tile containing `point` and the pixel offset of
/// `point` inside it.
///
/// Fails with [`MapError::ProjectionRange`] when `|lat| >= MAX_LATITUDE`; the
/// latitude is never clamped. Longitude `180` wraps to tile column `0`.
pub fn to_tile(point: &LatLng, zoom: Zoom) -> Result<TilePosition> {
    let (fx, fy) = fractional_tile(point, zoom)?;
    let n = zoom.tile_count();

    let tile_x = fx.floor();
    let tile_y = fy.floor();
    let tile = TileCoord::new(
        (tile_x as i64).rem_euclid(n as i64) as u32,
        (tile_y as u32).min(n - 1),
        zoom.level(),
    );
    let pixel = Point::new(
        (fx - tile_x) * TILE_SIZE as f64,
        (fy - tile_y) * TILE_SIZE as f64,
    );

    Ok(TilePosition { tile, pixel })
}

/// Inverse mapping: the geographic coordinate of the top-left corner of tile
/// `(x, y)` at `zoom`.
pub fn tile_origin(x: u32, y: u32, zoom: Zoom) -> LatLng {
    let n = zoom.tile_count() as f64;
    let lng = x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}
