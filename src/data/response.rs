//! Raw analysis-service payloads.
//!
//! Every analysis endpoint answers with the same outer shape:
//!
//! ```json
//! {
//!   "features": [ { "geometry": {...}, "properties": { "area_acres": 2.1, "tile_url": "..." } } ],
//!   "pixel_summary": {
//!     "healthy_pixel_percentage": 65.2,
//!     "healthy_pixel_coordinates": [[73.85, 18.52], ...]
//!   }
//! }
//! ```
//!
//! The body is kept as a [`serde_json::Value`] because the tile URL and the
//! summary field names move around between endpoints.

use crate::data::geojson::GeoJsonFeature;
use crate::{FieldError, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    body: Value,
}

impl AnalysisResponse {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// An empty body: no features and no summary.
    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let body: Value = serde_json::from_slice(bytes)?;
        if !body.is_object() {
            return Err(FieldError::ParseError("analysis response is not a JSON object".into()).into());
        }
        Ok(Self::new(body))
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn first_feature_value(&self) -> Option<&Value> {
        self.body.get("features")?.as_array()?.first()
    }

    pub fn first_feature(&self) -> Option<GeoJsonFeature> {
        self.first_feature_value().and_then(GeoJsonFeature::from_value)
    }

    /// The first feature whose geometry can outline the plot.
    pub fn boundary_feature(&self) -> Option<GeoJsonFeature> {
        self.body
            .get("features")?
            .as_array()?
            .iter()
            .filter_map(GeoJsonFeature::from_value)
            .find(GeoJsonFeature::is_boundary)
    }

    pub fn pixel_summary(&self) -> Option<&Map<String, Value>> {
        self.body.get("pixel_summary")?.as_object()
    }

    pub fn area_acres(&self) -> Option<f64> {
        self.first_feature()?.property_f64("area_acres")
    }
}

impl Default for AnalysisResponse {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for AnalysisResponse {
    fn from(body: Value) -> Self {
        Self::new(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let response = AnalysisResponse::new(json!({
            "features": [
                {"geometry": {"type": "Point", "coordinates": [73.8, 18.5]}, "properties": {}},
                {
                    "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]},
                    "properties": {"area_acres": 4.0}
                }
            ],
            "pixel_summary": {"weak_pixel_percentage": 12.0}
        }));

        assert!(response.pixel_summary().is_some());
        assert!(response.first_feature().is_some());
        // the boundary is the polygon, not the leading point feature
        assert!(response.boundary_feature().unwrap().is_boundary());
        assert_eq!(response.area_acres(), None);
    }

    #[test]
    fn test_empty_response() {
        let response = AnalysisResponse::empty();
        assert!(response.pixel_summary().is_none());
        assert!(response.boundary_feature().is_none());
        assert!(response.first_feature().is_none());
    }

    #[test]
    fn test_from_slice_rejects_non_objects() {
        assert!(AnalysisResponse::from_slice(b"[1,2,3]").is_err());
        assert!(AnalysisResponse::from_slice(b"not json").is_err());
        assert!(AnalysisResponse::from_slice(br#"{"features": []}"#).is_ok());
    }
}
