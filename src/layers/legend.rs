use crate::layers::analysis::AnalysisLayer;
use crate::layers::kind::LayerKind;
use serde::Serialize;

/// One legend row. Label, color and description come from the kind's class
/// table; only the percentage is data-driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendRow {
    pub label: &'static str,
    pub color: &'static str,
    pub percentage: u32,
    pub description: &'static str,
}

/// Legend rows in canonical class order, or nothing when the layer has no
/// summary (pending or failed fetch).
pub fn build_legend(kind: LayerKind, layer: Option<&AnalysisLayer>) -> Vec<LegendRow> {
    let Some(layer) = layer.filter(|layer| layer.kind == kind && layer.has_summary()) else {
        return Vec::new();
    };
    layer
        .buckets
        .iter()
        .map(|bucket| LegendRow {
            label: bucket.class.label,
            color: bucket.class.color,
            percentage: bucket.rounded_percentage(),
            description: bucket.class.description,
        })
        .collect()
}
