//! The farmer's plot as delivered by the plot directory.

use crate::core::constants::SQUARE_METRES_PER_ACRE;
use crate::core::geo::{LatLng, LatLngBounds};
use crate::data::geojson::GeoJsonGeometry;
use crate::{FieldError, Result};
use geo::{GeodesicArea, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Stable plot identity plus display fields. The boundary is optional until
/// a collaborator or an analysis layer supplies one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub plot_name: String,
    #[serde(default)]
    pub gat_number: Option<String>,
    #[serde(default)]
    pub plot_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub boundary: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub area_acres: Option<f64>,
}

impl Plot {
    pub fn new(plot_name: impl Into<String>) -> Self {
        Self {
            plot_name: plot_name.into(),
            gat_number: None,
            plot_number: None,
            address: None,
            boundary: None,
            area_acres: None,
        }
    }

    pub fn with_boundary(mut self, boundary: GeoJsonGeometry) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Parses the plot directory's JSON record.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let plot: Plot = serde_json::from_value(value.clone())?;
        if plot.plot_name.trim().is_empty() {
            return Err(FieldError::ParseError("plot record without plot_name".into()).into());
        }
        Ok(plot)
    }

    /// "Gat 112 / Plot 4" style label, falling back to the plot id.
    pub fn display_name(&self) -> String {
        match (&self.gat_number, &self.plot_number) {
            (Some(gat), Some(plot)) => format!("Gat {} / Plot {}", gat, plot),
            (Some(gat), None) => format!("Gat {}", gat),
            (None, Some(plot)) => format!("Plot {}", plot),
            (None, None) => self.plot_name.clone(),
        }
    }

    pub fn boundary_ring(&self) -> Vec<LatLng> {
        self.boundary
            .as_ref()
            .map(GeoJsonGeometry::exterior_ring)
            .unwrap_or_default()
    }

    /// Reported area, or the geodesic area of the boundary when none is reported.
    pub fn area_acres(&self) -> Option<f64> {
        self.area_acres
            .or_else(|| ring_area_acres(&self.boundary_ring()))
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(&self.boundary_ring())
    }

    pub fn center(&self) -> Option<LatLng> {
        self.bounds().map(|bounds| bounds.center())
    }
}

/// Geodesic area of a closed or open ring, in acres. Needs three vertices.
pub fn ring_area_acres(ring: &[LatLng]) -> Option<f64> {
    if ring.len() < 3 {
        return None;
    }
    let exterior: LineString<f64> = ring.iter().map(|p| (p.lng, p.lat)).collect::<Vec<_>>().into();
    let polygon = Polygon::new(exterior, vec![]);
    Some(polygon.geodesic_area_unsigned() / SQUARE_METRES_PER_ACRE)
}
