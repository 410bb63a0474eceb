//! Prelude module for common fieldmap types and traits
//!
//! `use fieldmap::prelude::*;` brings in the orchestrator, the layer types and
//! the collaborator seam.

pub use crate::core::{
    config::{EngineConfig, SourceConfig},
    date::{Clock, DatePaginator, FixedClock, PageDirection, SystemClock},
    geo::{LatLng, LatLngBounds, TileCoord},
    plot::Plot,
};

pub use crate::data::{geojson::GeoJsonFeature, response::AnalysisResponse};

pub use crate::layers::{
    build_legend, AnalysisLayer, CoordinateMatcher, LayerKind, LegendRow, PixelClass,
    PlotBoundaryCache, TileSource, TileUrlTemplate, TooltipEntry,
};

pub use crate::orchestrator::{LayerOrchestrator, MapSnapshot, OrchestratorState, PixelMarker};

pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::source::{AnalysisRequest, AnalysisSource, HttpAnalysisSource};

pub use crate::{Error as FieldError, Result};

pub use std::{pin::Pin, sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
