use crate::core::geo::LatLng;
use crate::data::geojson::GeoJsonFeature;
use crate::data::response::AnalysisResponse;

/// Last known plot outline, shared by every layer.
///
/// Fill-if-absent: the first boundary seen for a plot sticks until
/// [`clear`](Self::clear) is called on plot change. Errors and empty
/// responses never evict it.
#[derive(Debug, Clone, Default)]
pub struct PlotBoundaryCache {
    boundary: Option<GeoJsonFeature>,
}

impl PlotBoundaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches the response's boundary if nothing is cached yet.
    /// Returns true when the cache was filled by this call.
    pub fn observe(&mut self, response: &AnalysisResponse) -> bool {
        if self.boundary.is_some() {
            return false;
        }
        match response.boundary_feature() {
            Some(feature) => self.observe_feature(feature),
            None => false,
        }
    }

    /// Same as [`observe`](Self::observe) for an already extracted feature.
    pub fn observe_feature(&mut self, feature: GeoJsonFeature) -> bool {
        if self.boundary.is_some() || !feature.is_boundary() {
            return false;
        }
        log::debug!("plot boundary cached");
        self.boundary = Some(feature);
        true
    }

    pub fn get(&self) -> Option<&GeoJsonFeature> {
        self.boundary.as_ref()
    }

    /// Outer ring of the cached boundary.
    pub fn ring(&self) -> Option<Vec<LatLng>> {
        self.boundary
            .as_ref()?
            .geometry
            .as_ref()
            .map(|geometry| geometry.exterior_ring())
    }

    pub fn clear(&mut self) {
        self.boundary = None;
    }
}
