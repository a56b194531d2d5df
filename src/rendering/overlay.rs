//! Marker and line overlay: exact geo-to-pixel placement on the cropped
//! raster, and the primitives that draw there.

use crate::core::constants::LABEL_PADDING;
use crate::core::geo::{LatLng, Point};
use crate::core::projection;
use crate::layers::marker::{Color, Label, LabelAnchor, Marker, MarkerStyle, Polyline};
use crate::tiles::grid::TileGrid;
use crate::Result;
use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut, text_size};
use rusttype::{Font, Scale};

/// Maps geographic points into the pixel space of a cropped render.
#[derive(Debug, Clone, Copy)]
pub struct OverlayProjector<'a> {
    grid: &'a TileGrid,
    crop_origin: Point,
}

impl<'a> OverlayProjector<'a> {
    pub fn new(grid: &'a TileGrid, crop_origin: Point) -> Self {
        Self { grid, crop_origin }
    }

    /// Pixel of `point` relative to the top-left of the cropped image.
    ///
    /// Points outside the image are returned as-is, not discarded; a marker
    /// just off the edge may still have a visible label.
    pub fn project(&self, point: &LatLng) -> Result<Point> {
        let position = projection::to_tile(point, self.grid.zoom())?;
        Ok(self
            .grid
            .canvas_pixel(&position)
            .subtract(&self.crop_origin))
    }

    pub fn project_marker(&self, marker: &Marker) -> Result<Point> {
        self.project(&marker.position)
    }
}

/// Primitives the overlay is drawn with. Implementations clip to their own
/// bounds.
pub trait DrawingSurface {
    fn draw_line(&mut self, from: Point, to: Point, color: Color, width: u32);
    fn draw_point(&mut self, at: Point, style: &MarkerStyle);
    fn draw_label(&mut self, at: Point, label: &Label);
}

/// Draws lines, then markers with their labels, in insertion order.
pub fn draw_overlays<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    projector: &OverlayProjector<'_>,
    lines: &[Polyline],
    markers: &[Marker],
) -> Result<()> {
    for line in lines {
        let points = line
            .points
            .iter()
            .map(|point| projector.project(point))
            .collect::<Result<Vec<_>>>()?;
        for pair in points.windows(2) {
            surface.draw_line(pair[0], pair[1], line.color, line.width);
        }
    }

    for marker in markers {
        let at = projector.project_marker(marker)?;
        surface.draw_point(at, &marker.style);
        if let Some(label) = &marker.label {
            surface.draw_label(at, label);
        }
    }
    Ok(())
}

/// [`DrawingSurface`] over an RGBA raster. Without a font, labels are drawn
/// as their background box only, sized from an estimated glyph width.
pub struct ImageSurface<'a> {
    image: &'a mut RgbaImage,
    font: Option<&'a Font<'static>>,
}

impl<'a> ImageSurface<'a> {
    pub fn new(image: &'a mut RgbaImage) -> Self {
        Self { image, font: None }
    }

    pub fn with_font(mut self, font: Option<&'a Font<'static>>) -> Self {
        self.font = font;
        self
    }

    /// Alpha-blends `color` over the rectangle with corners rounded to
    /// `radius`, clipped to the image.
    fn fill_rounded_rect(
        &mut self,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        radius: i32,
        color: Color,
    ) {
        let (image_width, image_height) = self.image.dimensions();
        let x0 = left.max(0) as u32;
        let y0 = top.max(0) as u32;
        let x1 = (left + width).clamp(0, image_width as i32) as u32;
        let y1 = (top + height).clamp(0, image_height as i32) as u32;

        let radius = radius.clamp(0, width.min(height) / 2) as f32;
        let inner_x = (left as f32 + radius, (left + width) as f32 - radius);
        let inner_y = (top as f32 + radius, (top + height) as f32 - radius);

        let overlay = Rgba(color.0);
        for y in y0..y1 {
            let cy = y as f32 + 0.5;
            let dy = (inner_y.0 - cy).max(cy - inner_y.1).max(0.0);
            for x in x0..x1 {
                let cx = x as f32 + 0.5;
                let dx = (inner_x.0 - cx).max(cx - inner_x.1).max(0.0);
                // Pixel centers past the corner arc stay untouched.
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                self.image.get_pixel_mut(x, y).blend(&overlay);
            }
        }
    }

    fn text_extent(&self, label: &Label) -> (i32, i32) {
        match self.font {
            Some(font) => text_size(Scale::uniform(label.font_size), font, &label.text),
            None => {
                let glyphs = label.text.chars().count() as f32;
                (
                    (glyphs * label.font_size * 0.6).ceil() as i32,
                    label.font_size.ceil() as i32,
                )
            }
        }
    }
}

/// Top-left corner of a `width × height` box placed around `at`.
fn label_origin(at: Point, label: &Label, width: i32, height: i32) -> (i32, i32) {
    let (x, y) = (at.x.round() as i32, at.y.round() as i32);
    match label.anchor {
        LabelAnchor::Above => (x - width / 2, y - label.offset - height / 2),
        LabelAnchor::Below => (x - width / 2, y + label.offset - height / 2),
        LabelAnchor::Left => (x - label.offset - width, y - height / 2),
        LabelAnchor::Right => (x + label.offset, y - height / 2),
        LabelAnchor::Center => (x - width / 2, y - height / 2),
    }
}

impl DrawingSurface for ImageSurface<'_> {
    fn draw_line(&mut self, from: Point, to: Point, color: Color, width: u32) {
        let color = Rgba(color.0);
        let (start, end) = ((from.x as f32, from.y as f32), (to.x as f32, to.y as f32));
        if width <= 1 {
            draw_line_segment_mut(&mut *self.image, start, end, color);
            return;
        }

        // Thick lines are a run of discs along the segment.
        let radius = (width / 2).max(1) as i32;
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let length = (dx * dx + dy * dy).sqrt();
        let step = (radius as f32 * 0.5).max(0.5);
        let steps = (length / step).ceil() as i32;
        for i in 0..=steps {
            let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            let center = (
                (start.0 + dx * t).round() as i32,
                (start.1 + dy * t).round() as i32,
            );
            draw_filled_circle_mut(&mut *self.image, center, radius, color);
        }
    }

    fn draw_point(&mut self, at: Point, style: &MarkerStyle) {
        let center = (at.x.round() as i32, at.y.round() as i32);
        let radius = style.radius as i32;
        if style.outline_width > 0 {
            let outer = radius + style.outline_width as i32;
            draw_filled_circle_mut(&mut *self.image, center, outer, Rgba(style.outline.0));
        }
        draw_filled_circle_mut(&mut *self.image, center, radius, Rgba(style.fill.0));
    }

    fn draw_label(&mut self, at: Point, label: &Label) {
        if label.text.is_empty() {
            return;
        }
        let (text_width, text_height) = self.text_extent(label);
        let (box_width, box_height) = (text_width + 2 * LABEL_PADDING, text_height + 2 * LABEL_PADDING);
        let (left, top) = label_origin(at, label, box_width, box_height);

        self.fill_rounded_rect(
            left,
            top,
            box_width,
            box_height,
            LABEL_PADDING,
            label.background,
        );

        if let Some(font) = self.font {
            draw_text_mut(
                &mut *self.image,
                Rgba(label.text_color.0),
                left + LABEL_PADDING,
                top + LABEL_PADDING,
                Scale::uniform(label.font_size),
                font,
                &label.text,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projection::Zoom;
    use crate::MapError;

    fn grid_and_origin(width: u32, height: u32) -> (TileGrid, Point) {
        let grid = TileGrid::plan(
            &LatLng::new(35.6762, 139.6503),
            Zoom::new(10).unwrap(),
            width,
            height,
        )
        .unwrap();
        let center = grid.center_canvas_pixel();
        let origin = Point::new(
            (center.x - width as f64 / 2.0).floor(),
            (center.y - height as f64 / 2.0).floor(),
        );
        (grid, origin)
    }

    /// Records calls instead of drawing.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl DrawingSurface for Recorder {
        fn draw_line(&mut self, _: Point, _: Point, _: Color, _: u32) {
            self.calls.push("line".into());
        }

        fn draw_point(&mut self, at: Point, _: &MarkerStyle) {
            self.calls.push(format!("point {:.0},{:.0}", at.x, at.y));
        }

        fn draw_label(&mut self, _: Point, label: &Label) {
            self.calls.push(format!("label {}", label.text));
        }
    }

    #[test]
    fn test_center_projects_to_middle() {
        let (grid, origin) = grid_and_origin(800, 600);
        let projector = OverlayProjector::new(&grid, origin);
        let pixel = projector.project(&LatLng::new(35.6762, 139.6503)).unwrap();
        assert!((pixel.x - 400.0).abs() <= 1.0, "{:?}", pixel);
        assert!((pixel.y - 300.0).abs() <= 1.0, "{:?}", pixel);
    }

    #[test]
    fn test_offsets_follow_mercator() {
        let (grid, origin) = grid_and_origin(800, 600);
        let projector = OverlayProjector::new(&grid, origin);
        let center = projector.project(&LatLng::new(35.6762, 139.6503)).unwrap();
        let east = projector.project(&LatLng::new(35.6762, 139.7503)).unwrap();

        // 0.1 degrees of longitude at zoom 10.
        let expected = 0.1 / 360.0 * Zoom::new(10).unwrap().world_pixels();
        assert!((east.x - center.x - expected).abs() < 1e-6);
        assert!((east.y - center.y).abs() < 1e-6);
    }

    #[test]
    fn test_off_image_points_are_kept() {
        let (grid, origin) = grid_and_origin(200, 200);
        let projector = OverlayProjector::new(&grid, origin);
        let far = projector.project(&LatLng::new(35.6762, 141.0)).unwrap();
        assert!(far.x > 200.0);
        assert!(matches!(
            projector.project(&LatLng::new(88.0, 0.0)),
            Err(MapError::ProjectionRange { .. })
        ));
    }

    #[test]
    fn test_draw_order_is_lines_then_markers_in_sequence() {
        let (grid, origin) = grid_and_origin(800, 600);
        let projector = OverlayProjector::new(&grid, origin);
        let tokyo = LatLng::new(35.6762, 139.6503);
        let markers = vec![
            Marker::new(tokyo).with_label("first"),
            Marker::new(tokyo),
            Marker::new(tokyo).with_label("third"),
        ];
        let lines = vec![Polyline::new(vec![tokyo, LatLng::new(35.7, 139.7), tokyo])];

        let mut recorder = Recorder::default();
        draw_overlays(&mut recorder, &projector, &lines, &markers).unwrap();

        assert_eq!(
            recorder.calls,
            vec![
                "line",
                "line",
                "point 400,300",
                "label first",
                "point 400,300",
                "point 400,300",
                "label third",
            ]
        );
    }

    #[test]
    fn test_image_surface_draws_marker() {
        let mut image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        ImageSurface::new(&mut image).draw_point(Point::new(50.0, 50.0), &MarkerStyle::default());

        assert_eq!(image.get_pixel(50, 50), &Rgba(Color::RED.0));
        assert_eq!(image.get_pixel(50 + 11, 50), &Rgba(Color::DARK_RED.0));
        assert_eq!(image.get_pixel(50 + 14, 50), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_label_box_is_blended_above_marker() {
        let mut image = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
        let label = Label::new("Tokyo");
        ImageSurface::new(&mut image).draw_label(Point::new(100.0, 100.0), &label);

        // Semi-transparent white over black: gray, not white.
        let pixel = image.get_pixel(100, 100 - label.offset as u32);
        assert!(pixel.0[0] > 150 && pixel.0[0] < 255, "{:?}", pixel);
        assert_eq!(image.get_pixel(100, 100), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_label_box_has_rounded_corners() {
        let mut image = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
        let label = Label::new("Tokyo").with_anchor(LabelAnchor::Center);
        ImageSurface::new(&mut image).draw_label(Point::new(100.0, 100.0), &label);

        // Five estimated glyphs at 14px: a 50x22 box from (75, 89).
        let black = Rgba([0, 0, 0, 255]);
        let (left, top, right, bottom) = (75, 89, 124, 110);
        for (x, y) in [(left, top), (right, top), (left, bottom), (right, bottom)] {
            assert_eq!(image.get_pixel(x, y), &black, "corner ({}, {})", x, y);
        }

        let pad = LABEL_PADDING as u32;
        for (x, y) in [(left + pad, top), (left, top + pad), (right, bottom - pad), (100, 100)] {
            assert_ne!(image.get_pixel(x, y), &black, "edge ({}, {})", x, y);
        }
        assert_eq!(image.get_pixel(left - 1, 100), &black);
    }

    #[test]
    fn test_clipping_at_edges() {
        let mut image = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        let mut surface = ImageSurface::new(&mut image);
        surface.draw_point(Point::new(-5.0, -5.0), &MarkerStyle::default());
        surface.draw_label(Point::new(19.0, 0.0), &Label::new("edge"));
        surface.draw_line(Point::new(-50.0, 10.0), Point::new(50.0, 10.0), Color::BLUE, 4);

        assert_eq!(image.get_pixel(0, 0), &Rgba(Color::RED.0));
        assert_eq!(image.get_pixel(10, 10), &Rgba(Color::BLUE.0));
    }
}
