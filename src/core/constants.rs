//! Engine-wide constants for field overlays.
//! Keeping them in a single place makes it easier to tweak the magic numbers.

/// Days moved per date-paging step, shared by every date-dependent layer.
pub const PAGE_STEP_DAYS: u32 = 15;

/// Per-axis tolerance (degrees) when matching a coordinate against pixel buckets.
pub const COORDINATE_TOLERANCE_DEG: f64 = 0.00001;

/// Smallest expected spacing between neighbouring raster pixels (10 m grid).
pub const MIN_PIXEL_SPACING_DEG: f64 = 0.00009;

/// Legend classes at or above this coverage are not isolated on click.
pub const ISOLATE_COVERAGE_THRESHOLD: f64 = 99.0;

/// Square metres in one international acre.
pub const SQUARE_METRES_PER_ACRE: f64 = 4046.856_422_4;

/// Placeholders a tile URL template must carry.
pub const TILE_PLACEHOLDERS: [&str; 3] = ["{z}", "{x}", "{y}"];

/// Interval between completion polls while settling in-flight fetches.
pub const SETTLE_POLL_INTERVAL_MS: u64 = 5;
