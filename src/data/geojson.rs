use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<HashMap<String, serde_json::Value>>,
}

impl GeoJsonFeature {
    /// Reads a feature leniently: an unreadable geometry becomes `None`
    /// instead of failing the whole feature.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let geometry = object
            .get("geometry")
            .and_then(|g| serde_json::from_value::<GeoJsonGeometry>(g.clone()).ok());
        let properties = object
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        Some(Self {
            id: object.get("id").cloned(),
            geometry,
            properties,
        })
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.as_ref()?.get(key)
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.property(key)?.as_f64()
    }

    /// True when the geometry can outline a plot.
    pub fn is_boundary(&self) -> bool {
        self.geometry
            .as_ref()
            .map(|g| g.is_areal() && g.exterior_ring().len() >= 3)
            .unwrap_or(false)
    }
}

impl GeoJsonGeometry {
    pub fn is_areal(&self) -> bool {
        matches!(
            self,
            GeoJsonGeometry::Polygon { .. } | GeoJsonGeometry::MultiPolygon { .. }
        )
    }

    /// Outer ring of a polygon (first polygon of a multipolygon), as LatLng.
    pub fn exterior_ring(&self) -> Vec<LatLng> {
        let ring = match self {
            GeoJsonGeometry::Polygon { coordinates } => coordinates.first(),
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                coordinates.first().and_then(|polygon| polygon.first())
            }
            _ => None,
        };
        ring.map(|ring| ring.iter().map(|c| LatLng::from_lng_lat(*c)).collect())
            .unwrap_or_default()
    }
}
