use crate::core::constants::{LABEL_FONT_SIZE, LABEL_OFFSET, MARKER_OUTLINE_WIDTH, MARKER_RADIUS};
use crate::core::geo::LatLng;
use crate::{MapError, Result};
use image::Rgba;
use serde::{Deserialize, Serialize};

/// RGBA color. Deserializes from `"#rrggbb"`, `"#rrggbbaa"` or `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color(pub [u8; 4]);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels([u8; 4]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = MapError;

    fn try_from(repr: ColorRepr) -> Result<Self> {
        match repr {
            ColorRepr::Hex(hex) => Color::from_hex(&hex),
            ColorRepr::Channels(channels) => Ok(Color(channels)),
        }
    }
}

impl Color {
    pub const RED: Color = Color([255, 0, 0, 255]);
    pub const DARK_RED: Color = Color([139, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const BLUE: Color = Color([0, 0, 255, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| MapError::Config(format!("invalid color '{}'", hex)))
        };
        match digits.len() {
            6 if digits.is_ascii() => Ok(Self([channel(0)?, channel(2)?, channel(4)?, 255])),
            8 if digits.is_ascii() => {
                Ok(Self([channel(0)?, channel(2)?, channel(4)?, channel(6)?]))
            }
            _ => Err(MapError::Config(format!("invalid color '{}'", hex))),
        }
    }

    /// Same color with its alpha scaled by `opacity` (0.0 to 1.0).
    pub fn with_opacity(self, opacity: f32) -> Self {
        let [r, g, b, a] = self.0;
        Self([r, g, b, (a as f32 * opacity.clamp(0.0, 1.0)).round() as u8])
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba(color.0)
    }
}

/// Where a label sits relative to its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelAnchor {
    #[default]
    Above,
    Below,
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    pub text: String,
    pub anchor: LabelAnchor,
    /// Distance between the marker point and the nearest label edge.
    pub offset: i32,
    pub font_size: f32,
    pub text_color: Color,
    pub background: Color,
}

impl Default for Label {
    fn default() -> Self {
        Self {
            text: String::new(),
            anchor: LabelAnchor::Above,
            offset: LABEL_OFFSET,
            font_size: LABEL_FONT_SIZE,
            text_color: Color::BLACK,
            background: Color::WHITE.with_opacity(0.8),
        }
    }
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_anchor(mut self, anchor: LabelAnchor) -> Self {
        self.anchor = anchor;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub fill: Color,
    pub outline: Color,
    pub radius: u32,
    pub outline_width: u32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            fill: Color::RED,
            outline: Color::DARK_RED,
            radius: MARKER_RADIUS,
            outline_width: MARKER_OUTLINE_WIDTH,
        }
    }
}

/// A point of interest drawn on top of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: LatLng,
    #[serde(default)]
    pub style: MarkerStyle,
    #[serde(default)]
    pub label: Option<Label>,
}

impl Marker {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            style: MarkerStyle::default(),
            label: None,
        }
    }

    pub fn with_style(mut self, style: MarkerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_label(mut self, text: impl Into<String>) -> Self {
        self.label = Some(Label::new(text));
        self
    }

    pub fn with_styled_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn position(&self) -> LatLng {
        self.position
    }
}

/// An open path through geographic points, drawn beneath all markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<LatLng>,
    #[serde(default = "Polyline::default_color")]
    pub color: Color,
    #[serde(default = "Polyline::default_width")]
    pub width: u32,
}

impl Polyline {
    pub fn new(points: Vec<LatLng>) -> Self {
        Self {
            points,
            color: Self::default_color(),
            width: Self::default_width(),
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    fn default_color() -> Color {
        Color::BLUE
    }

    fn default_width() -> u32 {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::from_hex("#f0f0f0").unwrap(), Color([240, 240, 240, 255]));
        assert_eq!(Color::from_hex("ff000080").unwrap(), Color([255, 0, 0, 128]));
        assert!(Color::from_hex("#fff").is_err());
        assert!(Color::from_hex("#gg0000").is_err());

        let parsed: Color = serde_json::from_str("\"#8b0000\"").unwrap();
        assert_eq!(parsed, Color::DARK_RED);
        let parsed: Color = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(parsed, Color([1, 2, 3, 4]));
    }

    #[test]
    fn test_marker_defaults() {
        let marker = Marker::new(LatLng::new(35.6586, 139.7454)).with_label("Tokyo Tower");
        assert_eq!(marker.style.radius, 10);
        assert_eq!(marker.style.fill, Color::RED);
        let label = marker.label.unwrap();
        assert_eq!(label.anchor, LabelAnchor::Above);
        assert_eq!(label.offset, 20);
        assert_eq!(label.background.0[3], 204);
    }

    #[test]
    fn test_marker_from_json() {
        let json = r#"{
            "position": {"lat": 35.7148, "lng": 139.7967},
            "label": {"text": "Skytree", "anchor": "below"}
        }"#;
        let marker: Marker = serde_json::from_str(json).unwrap();
        assert_eq!(marker.style, MarkerStyle::default());
        let label = marker.label.unwrap();
        assert_eq!(label.text, "Skytree");
        assert_eq!(label.anchor, LabelAnchor::Below);
        assert_eq!(label.offset, LABEL_OFFSET);
    }

    #[test]
    fn test_polyline_defaults() {
        let line: Polyline =
            serde_json::from_str(r#"{"points": [{"lat": 0.0, "lng": 0.0}]}"#).unwrap();
        assert_eq!(line.width, 3);
        assert_eq!(line.color, Color::BLUE);
    }

    #[test]
    fn test_builders() {
        let line = Polyline::new(vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)])
            .with_color(Color::RED)
            .with_width(6);
        assert_eq!((line.color, line.width), (Color::RED, 6));

        let label = Label::new("Harbor").with_anchor(LabelAnchor::Right);
        let marker = Marker::new(LatLng::new(35.45, 139.64)).with_styled_label(label.clone());
        assert_eq!(marker.label, Some(label));
    }
}
