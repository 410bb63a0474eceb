//! Analysis layers and the pieces derived from them
//!
//! - [`kind`]: the four layer kinds and their class tables
//! - [`analysis`]: one parsed analysis response
//! - [`legend`], [`matcher`], [`tile`]: what the map draws from a layer
//! - [`boundary`]: the plot outline shared across layers

pub mod analysis;
pub mod boundary;
pub mod kind;
pub mod legend;
pub mod matcher;
pub mod tile;

pub use analysis::{AnalysisLayer, ClassBucket};
pub use boundary::PlotBoundaryCache;
pub use kind::{LayerKind, PixelClass};
pub use legend::{build_legend, LegendRow};
pub use matcher::{CoordinateMatcher, TooltipEntry};
pub use tile::{resolve_tile_url, TileSource, TileUrlTemplate};
