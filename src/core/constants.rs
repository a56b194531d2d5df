//! Core constants derived from the slippy-map tile scheme.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Latitude bound of the Web Mercator projection, in degrees. Inputs must
/// satisfy `|lat| < MAX_LATITUDE`.
pub const MAX_LATITUDE: f64 = 85.0511;

/// Highest zoom level accepted by the projector.
pub const MAX_ZOOM: u8 = 19;

/// Largest accepted output width or height. Keeps the stitched canvas
/// dimensions well inside `u32`.
pub const MAX_VIEWPORT_PIXELS: u32 = 16_384;

/// Fill color of placeholder tiles (`#f0f0f0`).
pub const FALLBACK_TILE_RGBA: [u8; 4] = [0xf0, 0xf0, 0xf0, 0xff];

/// Default tile server, addressed as `{base}/{z}/{x}/{y}.png`.
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org";

/// User-Agent sent to tile servers unless the caller overrides it.
pub const DEFAULT_USER_AGENT: &str = concat!("tilestitch/", env!("CARGO_PKG_VERSION"));

/// Marker defaults: red disc with a dark red outline.
pub const MARKER_RADIUS: u32 = 10;
pub const MARKER_OUTLINE_WIDTH: u32 = 2;

/// Vertical distance between a marker and a label anchored above it.
pub const LABEL_OFFSET: i32 = 20;

/// Padding around label text inside its background box.
pub const LABEL_PADDING: i32 = 4;

/// Default label text height in pixels.
pub const LABEL_FONT_SIZE: f32 = 14.0;
