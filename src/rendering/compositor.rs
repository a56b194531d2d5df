//! Canvas compositing: pastes every grid tile at its grid offset, then crops
//! the viewport out of the result.

use crate::core::constants::TILE_SIZE;
use crate::core::geo::{Point, TileCoord};
use crate::core::viewport::Viewport;
use crate::layers::marker::Color;
use crate::prelude::HashMap;
use crate::tiles::grid::TileGrid;
use crate::tiles::loader::TileImage;
use crate::{MapError, Result};
use image::{imageops, RgbaImage};

/// The stitched tiles of one grid. Owned by a single render call.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
    /// Canvas pixel of the requested center.
    center: Point,
}

impl Canvas {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn center(&self) -> Point {
        self.center
    }
}

/// The viewport cut out of a [`Canvas`].
#[derive(Debug, Clone)]
pub struct Cropped {
    pub image: RgbaImage,
    /// Canvas pixel of the crop's top-left corner.
    pub origin: Point,
}

/// Stitches `tiles` into a canvas of `columns × 256` by `rows × 256` pixels.
///
/// Cells without an entry in `tiles` (beyond the poles, or never resolved)
/// keep the `fallback` color, so the canvas is always complete.
pub fn composite(
    grid: &TileGrid,
    tiles: &HashMap<TileCoord, TileImage>,
    fallback: Color,
) -> Canvas {
    let (width, height) = grid.canvas_size();
    let mut image = RgbaImage::from_pixel(width, height, fallback.into());

    for (column, row, cell) in grid.cells() {
        let Some(tile) = cell.coord().and_then(|coord| tiles.get(&coord)) else {
            continue;
        };
        imageops::replace(
            &mut image,
            tile.image(),
            (column * TILE_SIZE) as i64,
            (row * TILE_SIZE) as i64,
        );
    }

    Canvas {
        image,
        center: grid.center_canvas_pixel(),
    }
}

/// Crops `viewport.width × viewport.height` pixels so that the requested
/// center lands on the middle pixel of the result.
///
/// Fails with [`MapError::InsufficientTileCoverage`] instead of reading past
/// the canvas edge.
pub fn crop(canvas: &Canvas, viewport: &Viewport) -> Result<Cropped> {
    let (width, height) = (viewport.width, viewport.height);
    let left = (canvas.center.x - width as f64 / 2.0).floor() as i64;
    let top = (canvas.center.y - height as f64 / 2.0).floor() as i64;

    let fits = left >= 0
        && top >= 0
        && left + width as i64 <= canvas.width() as i64
        && top + height as i64 <= canvas.height() as i64;
    if !fits {
        return Err(MapError::InsufficientTileCoverage {
            canvas_width: canvas.width(),
            canvas_height: canvas.height(),
            width,
            height,
            left,
            top,
        });
    }

    let image = imageops::crop_imm(&canvas.image, left as u32, top as u32, width, height).to_image();
    Ok(Cropped {
        image,
        origin: Point::new(left as f64, top as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::core::projection::Zoom;
    use crate::tiles::loader::FallbackReason;
    use image::Rgba;

    const GRAY: Color = Color([0xf0, 0xf0, 0xf0, 0xff]);

    fn shaded_tiles(grid: &TileGrid) -> HashMap<TileCoord, TileImage> {
        grid.distinct_tiles()
            .into_iter()
            .map(|coord| {
                let color = Color::rgb(coord.x as u8, coord.y as u8, 0);
                let tile = TileImage::placeholder(Some(coord), color, FallbackReason::Failed);
                (coord, tile)
            })
            .collect()
    }

    fn tokyo() -> (TileGrid, Viewport) {
        let center = LatLng::new(35.6762, 139.6503);
        let zoom = Zoom::new(10).unwrap();
        (
            TileGrid::plan(&center, zoom, 800, 600).unwrap(),
            Viewport::new(center, zoom, 800, 600).unwrap(),
        )
    }

    #[test]
    fn test_tiles_land_at_grid_offsets() {
        let (grid, _) = tokyo();
        let canvas = composite(&grid, &shaded_tiles(&grid), GRAY);

        assert_eq!((canvas.width(), canvas.height()), (1536, 1280));
        for (column, row, cell) in grid.cells() {
            let coord = cell.coord().unwrap();
            let expected = Rgba([coord.x as u8, coord.y as u8, 0, 255]);
            let (x, y) = (column * TILE_SIZE, row * TILE_SIZE);
            assert_eq!(canvas.image().get_pixel(x, y), &expected);
            assert_eq!(canvas.image().get_pixel(x + 255, y + 255), &expected);
        }
    }

    #[test]
    fn test_missing_tiles_keep_fallback_color() {
        let (grid, _) = tokyo();
        let canvas = composite(&grid, &HashMap::default(), GRAY);
        assert!(canvas.image().pixels().all(|p| *p == Rgba(GRAY.0)));
    }

    #[test]
    fn test_crop_is_exact_and_centered() {
        let (grid, viewport) = tokyo();
        let canvas = composite(&grid, &shaded_tiles(&grid), GRAY);
        let cropped = crop(&canvas, &viewport).unwrap();

        assert_eq!(cropped.image.dimensions(), (800, 600));
        let center = canvas.center();
        assert_eq!(cropped.origin.x, (center.x - 400.0).floor());
        assert_eq!(cropped.origin.y, (center.y - 300.0).floor());

        // The center tile (909, 403) is under the middle pixel.
        assert_eq!(cropped.image.get_pixel(400, 300), &Rgba([909u32 as u8, 403u32 as u8, 0, 255]));
    }

    #[test]
    fn test_crop_outside_canvas_fails() {
        let (grid, _) = tokyo();
        let canvas = composite(&grid, &HashMap::default(), GRAY);
        let oversized = Viewport::new(LatLng::new(35.6762, 139.6503), grid.zoom(), 4000, 600).unwrap();

        assert!(matches!(
            crop(&canvas, &oversized),
            Err(MapError::InsufficientTileCoverage { width: 4000, .. })
        ));
    }
}
