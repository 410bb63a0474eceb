//! Collaborator seam: where analysis results and plot records come from.

pub mod http;

use crate::core::plot::Plot;
use crate::data::response::AnalysisResponse;
use crate::layers::kind::LayerKind;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use http::HttpAnalysisSource;

/// One analysis fetch: a layer kind for a plot, windowed to `end_date`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub plot_id: String,
    pub kind: LayerKind,
    pub end_date: NaiveDate,
}

impl AnalysisRequest {
    pub fn new(plot_id: impl Into<String>, kind: LayerKind, end_date: NaiveDate) -> Self {
        Self {
            plot_id: plot_id.into(),
            kind,
            end_date,
        }
    }
}

impl std::fmt::Display for AnalysisRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}/{}", self.kind, self.plot_id, self.end_date)
    }
}

#[async_trait]
pub trait AnalysisSource: Send + Sync {
    /// Fetches one analysis layer. Transport and parse failures are errors;
    /// the orchestrator turns them into an absent layer.
    async fn fetch_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;

    /// Fetches the plot record (geometry and display fields).
    async fn fetch_plot(&self, plot_id: &str) -> Result<Plot>;
}
