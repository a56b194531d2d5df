pub mod marker;

// Re-export the essential types
pub use marker::{Color, Label, LabelAnchor, Marker, MarkerStyle, Polyline};
