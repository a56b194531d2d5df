//! Prelude module for common tilestitch types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilestitch::prelude::*;`

pub use crate::core::{
    config::{RenderConfig, RenderProfile, TileLoaderConfig},
    geo::{LatLng, Point, TileCoord},
    map::StaticMap,
    projection::{TilePosition, Zoom},
    viewport::Viewport,
};

pub use crate::layers::marker::{Color, Label, LabelAnchor, Marker, MarkerStyle, Polyline};

pub use crate::tiles::{
    cache::TileCache,
    grid::{GridCell, TileGrid},
    loader::{HttpTileProvider, TileFetcher, TileImage, TileProvider},
    source::{OpenStreetMapSource, TileSource, UrlTemplateSource},
};

pub use crate::rendering::{
    overlay::{DrawingSurface, ImageSurface, OverlayProjector},
    pipeline::{RenderResult, RenderStats, StaticMapRenderer},
};

pub use crate::{MapError, Result};

pub use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use tokio_util::sync::CancellationToken;
