//! # fieldmap
//!
//! Field-monitoring map engine for farm plots.
//!
//! Four remote-sensing analysis layers (crop growth, water uptake, soil
//! moisture, pest detection) are fetched per plot and per end date. Each one
//! yields a raster tile URL, per-class pixel percentages and the coordinates of
//! the pixels in each class. The engine turns that into a legend, isolated
//! pixel markers and cross-layer hover tooltips, and keeps everything
//! consistent while the farmer switches plot, layer or date.
//!
//! [`LayerOrchestrator`] owns the selection state; everything else is the
//! pure machinery it composes.

pub mod core;
pub mod data;
pub mod layers;
pub mod orchestrator;
pub mod prelude;
pub mod runtime;
pub mod source;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{EngineConfig, SourceConfig},
    date::{Clock, DatePaginator, FixedClock, PageDirection, SystemClock},
    geo::{LatLng, LatLngBounds, TileCoord},
    plot::Plot,
};

pub use data::{
    geojson::{GeoJsonFeature, GeoJsonGeometry},
    response::AnalysisResponse,
};

pub use layers::{
    build_legend, resolve_tile_url, AnalysisLayer, CoordinateMatcher, LayerKind, LegendRow,
    PixelClass, PlotBoundaryCache, TileSource, TileUrlTemplate, TooltipEntry,
};

pub use orchestrator::{
    LayerOrchestrator, MapSnapshot, OrchestratorState, PixelMarker, SelectionContext,
};

pub use source::{AnalysisRequest, AnalysisSource, HttpAnalysisSource};

/// Installs an `env_logger` driven by `RUST_LOG`. Later calls are no-ops.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Error type alias for convenience
pub type Error = FieldError;
