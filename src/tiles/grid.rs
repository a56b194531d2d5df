//! Tile grid planning: the rectangular block of tiles whose composite covers
//! a viewport plus a one-tile margin on every side.

use crate::core::constants::TILE_SIZE;
use crate::core::geo::{LatLng, Point, TileCoord};
use crate::core::projection::{self, TilePosition, Zoom};
use crate::core::viewport;
use crate::prelude::HashSet;
use crate::Result;

/// One cell of a [`TileGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridCell {
    Tile(TileCoord),
    /// Beyond the poles. Rendered as a fallback tile.
    Empty,
}

impl GridCell {
    pub fn coord(&self) -> Option<TileCoord> {
        match self {
            Self::Tile(coord) => Some(*coord),
            Self::Empty => None,
        }
    }
}

/// Row-major rectangle of tile cells centered on the tile holding the
/// requested center.
///
/// Columns wrap around the antimeridian, so the same [`TileCoord`] may occupy
/// several cells (always the case at low zooms). Rows never wrap.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    zoom: Zoom,
    columns: u32,
    rows: u32,
    /// Unwrapped tile index of the top-left cell.
    origin: (i64, i64),
    center: TilePosition,
    cells: Vec<GridCell>,
}

/// Tiles needed along an axis of `pixels`: full coverage plus one tile each side.
fn tiles_for_axis(pixels: u32) -> u32 {
    pixels.div_ceil(TILE_SIZE) + 2
}

impl TileGrid {
    /// Plans the grid for a `width × height` view centered on `center`.
    pub fn plan(center: &LatLng, zoom: Zoom, width: u32, height: u32) -> Result<Self> {
        viewport::check_size(width, height)?;

        let center = projection::to_tile(center, zoom)?;
        let columns = tiles_for_axis(width);
        let rows = tiles_for_axis(height);
        let origin = (
            center.tile.x as i64 - ((columns - 1) / 2) as i64,
            center.tile.y as i64 - ((rows - 1) / 2) as i64,
        );

        let mut cells = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows as i64 {
            for col in 0..columns as i64 {
                let cell = TileCoord::wrapped(origin.0 + col, origin.1 + row, zoom.level())
                    .map_or(GridCell::Empty, GridCell::Tile);
                cells.push(cell);
            }
        }

        log::debug!(
            "planned {}x{} grid at zoom {} around tile {}",
            columns,
            rows,
            zoom.level(),
            center.tile
        );

        Ok(Self {
            zoom,
            columns,
            rows,
            origin,
            center,
            cells,
        })
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Projection of the requested center.
    pub fn center(&self) -> &TilePosition {
        &self.center
    }

    /// Grid position `(column, row)` of the center tile.
    pub fn center_cell(&self) -> (u32, u32) {
        ((self.columns - 1) / 2, (self.rows - 1) / 2)
    }

    pub fn cell(&self, column: u32, row: u32) -> Option<GridCell> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells
            .get((row * self.columns + column) as usize)
            .copied()
    }

    /// Cells in row-major order with their `(column, row)` positions.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, GridCell)> + '_ {
        let columns = self.columns;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i as u32 % columns, i as u32 / columns, *cell))
    }

    /// Every distinct tile in the grid, in first-seen order.
    pub fn distinct_tiles(&self) -> Vec<TileCoord> {
        let mut seen = HashSet::default();
        self.cells
            .iter()
            .filter_map(GridCell::coord)
            .filter(|coord| seen.insert(*coord))
            .collect()
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.cells.contains(&GridCell::Tile(*coord))
    }

    /// Size in pixels of the composited canvas.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.columns * TILE_SIZE, self.rows * TILE_SIZE)
    }

    /// Pixel of the requested center inside the canvas, at sub-pixel precision.
    pub fn center_canvas_pixel(&self) -> Point {
        self.canvas_pixel(&self.center)
    }

    /// Canvas pixel of a projected position.
    ///
    /// Among the antimeridian copies of the position, the one closest to the
    /// grid center is chosen. The result may lie outside the canvas.
    pub fn canvas_pixel(&self, position: &TilePosition) -> Point {
        let tile = TILE_SIZE as f64;
        let world_tiles = self.zoom.tile_count() as i64;

        let mut column = position.tile.x as i64 - self.origin.0;
        let center_column = self.center.tile.x as i64 - self.origin.0;
        let shift = (center_column - column) as f64 / world_tiles as f64;
        column += shift.round() as i64 * world_tiles;

        let row = position.tile.y as i64 - self.origin.1;
        Point::new(
            column as f64 * tile + position.pixel.x,
            row as f64 * tile + position.pixel.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::MAX_VIEWPORT_PIXELS;
    use crate::MapError;

    fn zoom(level: i64) -> Zoom {
        Zoom::new(level).unwrap()
    }

    #[test]
    fn test_tokyo_grid() {
        let grid = TileGrid::plan(&LatLng::new(35.6762, 139.6503), zoom(10), 800, 600).unwrap();
        assert_eq!((grid.columns(), grid.rows()), (6, 5));
        assert_eq!(grid.center().tile, TileCoord::new(909, 403, 10));

        let (col, row) = grid.center_cell();
        assert_eq!(
            grid.cell(col, row),
            Some(GridCell::Tile(TileCoord::new(909, 403, 10)))
        );
        assert_eq!(grid.cell(0, 0), Some(GridCell::Tile(TileCoord::new(907, 401, 10))));
        assert_eq!(grid.cell(6, 0), None);
        assert_eq!(grid.distinct_tiles().len(), 30);
        assert_eq!(grid.canvas_size(), (1536, 1280));
    }

    #[test]
    fn test_grid_covers_every_viewport() {
        let center = LatLng::new(-33.8688, 151.2093);
        for width in [1, 2, 255, 256, 257, 511, 512, 513, 800, 1023, 1024, 2000, 4096] {
            for height in [1, 256, 300, 767, 768, 769, 4096] {
                let grid = TileGrid::plan(&center, zoom(12), width, height).unwrap();
                assert!(grid.columns() >= 3 && grid.rows() >= 3);
                assert!(grid.contains(&grid.center().tile));

                let (canvas_w, canvas_h) = grid.canvas_size();
                let c = grid.center_canvas_pixel();
                let left = (c.x - width as f64 / 2.0).floor();
                let top = (c.y - height as f64 / 2.0).floor();
                assert!(left >= 0.0 && top >= 0.0, "{}x{}", width, height);
                assert!(left + width as f64 <= canvas_w as f64, "{}x{}", width, height);
                assert!(top + height as f64 <= canvas_h as f64, "{}x{}", width, height);
            }
        }
    }

    #[test]
    fn test_antimeridian_wrap() {
        let grid = TileGrid::plan(&LatLng::new(0.0, 179.9), zoom(3), 256, 256).unwrap();
        assert_eq!(grid.center().tile.x, 7);
        assert_eq!(grid.cell(2, 1), Some(GridCell::Tile(TileCoord::new(0, 4, 3))));
        assert_eq!(grid.cell(0, 1), Some(GridCell::Tile(TileCoord::new(6, 4, 3))));
    }

    #[test]
    fn test_poles_are_empty_not_wrapped() {
        let grid = TileGrid::plan(&LatLng::new(85.0, 0.0), zoom(2), 256, 256).unwrap();
        assert_eq!(grid.center().tile.y, 0);
        for col in 0..grid.columns() {
            assert_eq!(grid.cell(col, 0), Some(GridCell::Empty));
            assert!(matches!(grid.cell(col, 1), Some(GridCell::Tile(_))));
        }
    }

    #[test]
    fn test_zoom_zero_replicates_single_tile() {
        let grid = TileGrid::plan(&LatLng::new(30.0, 0.0), zoom(0), 800, 600).unwrap();
        assert_eq!(grid.distinct_tiles(), vec![TileCoord::new(0, 0, 0)]);
        let (col, row) = grid.center_cell();
        for c in 0..grid.columns() {
            assert_eq!(grid.cell(c, row), Some(GridCell::Tile(TileCoord::new(0, 0, 0))));
        }
        assert_eq!(grid.cell(col, 0), Some(GridCell::Empty));
    }

    #[test]
    fn test_canvas_pixel_picks_nearest_copy() {
        let grid = TileGrid::plan(&LatLng::new(0.0, 179.0), zoom(2), 512, 256).unwrap();
        let east = projection::to_tile(&LatLng::new(0.0, -179.0), zoom(2)).unwrap();
        let center = grid.center_canvas_pixel();
        let point = grid.canvas_pixel(&east);
        // 2 degrees east of the center, not a world away.
        let world = zoom(2).world_pixels();
        assert!((point.x - center.x - 2.0 / 360.0 * world).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_empty_viewport() {
        assert!(matches!(
            TileGrid::plan(&LatLng::new(0.0, 0.0), zoom(1), 0, 100),
            Err(MapError::InvalidViewport(_))
        ));
        assert!(matches!(
            TileGrid::plan(&LatLng::new(86.0, 0.0), zoom(1), 100, 100),
            Err(MapError::ProjectionRange { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_viewport() {
        let center = LatLng::new(0.0, 0.0);
        assert!(matches!(
            TileGrid::plan(&center, zoom(10), u32::MAX, 1),
            Err(MapError::InvalidViewport(_))
        ));
        assert!(matches!(
            TileGrid::plan(&center, zoom(10), 1, MAX_VIEWPORT_PIXELS + 1),
            Err(MapError::InvalidViewport(_))
        ));

        let grid = TileGrid::plan(&center, zoom(10), MAX_VIEWPORT_PIXELS, 1).unwrap();
        assert_eq!(grid.columns(), MAX_VIEWPORT_PIXELS / TILE_SIZE + 2);
        assert_eq!(grid.canvas_size().0, grid.columns() * TILE_SIZE);
    }
}
