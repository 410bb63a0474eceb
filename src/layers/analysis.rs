//! Parsed analysis layers.
//!
//! One generic parser serves all four kinds; the kind's class table decides
//! which summary fields are read.

use crate::core::geo::LatLng;
use crate::data::geojson::GeoJsonFeature;
use crate::data::response::AnalysisResponse;
use crate::layers::kind::{LayerKind, PixelClass};
use crate::layers::tile::{resolve_tile_url, TileUrlTemplate};
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use serde_json::{Map, Value};

/// Pixels of one class within one layer.
#[derive(Debug, Clone)]
pub struct ClassBucket {
    pub class: &'static PixelClass,
    /// 0-100, as reported by the service.
    pub percentage: f64,
    pub coordinates: Vec<LatLng>,
}

impl ClassBucket {
    pub fn label(&self) -> &'static str {
        self.class.label
    }

    pub fn rounded_percentage(&self) -> u32 {
        round_percentage(self.percentage)
    }
}

pub(crate) fn round_percentage(percentage: f64) -> u32 {
    if percentage.is_finite() {
        percentage.round().clamp(0.0, 100.0) as u32
    } else {
        0
    }
}

type IndexedPixel = GeomWithData<[f64; 2], usize>;

/// R-tree over every bucket coordinate, tagged with its class index.
#[derive(Clone)]
pub struct CoordinateIndex {
    tree: RTree<IndexedPixel>,
}

impl CoordinateIndex {
    fn build(buckets: &[ClassBucket]) -> Self {
        let pixels = buckets
            .iter()
            .enumerate()
            .flat_map(|(index, bucket)| {
                bucket
                    .coordinates
                    .iter()
                    .map(move |c| IndexedPixel::new([c.lng, c.lat], index))
            })
            .collect();
        Self {
            tree: RTree::bulk_load(pixels),
        }
    }

    /// Lowest class index with a pixel within `tolerance` on both axes.
    pub fn lookup(&self, coordinate: &LatLng, tolerance: f64) -> Option<usize> {
        let envelope = AABB::from_corners(
            [coordinate.lng - tolerance, coordinate.lat - tolerance],
            [coordinate.lng + tolerance, coordinate.lat + tolerance],
        );
        self.tree
            .locate_in_envelope(&envelope)
            .filter(|pixel| {
                let [lng, lat] = *pixel.geom();
                LatLng::new(lat, lng).within_tolerance(coordinate, tolerance)
            })
            .map(|pixel| pixel.data)
            .min()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CoordinateIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateIndex")
            .field("pixels", &self.tree.size())
            .finish()
    }
}

/// One fetched analysis result. Replaced wholesale on every fetch.
#[derive(Debug, Clone)]
pub struct AnalysisLayer {
    pub kind: LayerKind,
    /// Empty when the response carried no `pixel_summary`.
    pub buckets: Vec<ClassBucket>,
    pub boundary: Option<GeoJsonFeature>,
    pub tile_url: Option<TileUrlTemplate>,
    pub area_acres: Option<f64>,
    index: CoordinateIndex,
}

impl AnalysisLayer {
    pub fn from_response(kind: LayerKind, response: &AnalysisResponse) -> Self {
        let buckets = response
            .pixel_summary()
            .map(|summary| parse_summary(kind, summary))
            .unwrap_or_default();
        let index = CoordinateIndex::build(&buckets);

        Self {
            kind,
            buckets,
            boundary: response.boundary_feature(),
            tile_url: resolve_tile_url(response),
            area_acres: response.area_acres(),
            index,
        }
    }

    pub fn has_summary(&self) -> bool {
        !self.buckets.is_empty()
    }

    pub fn bucket(&self, label: &str) -> Option<&ClassBucket> {
        self.buckets.iter().find(|bucket| bucket.label() == label)
    }

    pub fn index(&self) -> &CoordinateIndex {
        &self.index
    }

    pub fn pixel_count(&self) -> usize {
        self.index.len()
    }
}

/// Reads every class of `kind` from the summary, in canonical order.
/// A class whose fields are missing is kept with 0% and no coordinates.
fn parse_summary(kind: LayerKind, summary: &Map<String, Value>) -> Vec<ClassBucket> {
    kind.classes()
        .iter()
        .map(|class| {
            let percentage = class
                .prefixes
                .iter()
                .find_map(|prefix| summary.get(&PixelClass::percentage_field(prefix)))
                .and_then(parse_percentage)
                .unwrap_or(0.0);
            let coordinates = class
                .prefixes
                .iter()
                .find_map(|prefix| summary.get(&PixelClass::coordinates_field(prefix)))
                .map(parse_coordinates)
                .unwrap_or_default();
            ClassBucket {
                class,
                percentage,
                coordinates,
            }
        })
        .collect()
}

fn parse_percentage(value: &Value) -> Option<f64> {
    let percentage = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    percentage.is_finite().then(|| percentage.clamp(0.0, 100.0))
}

/// Malformed points are skipped one by one.
fn parse_coordinates(value: &Value) -> Vec<LatLng> {
    let Some(points) = value.as_array() else {
        log::debug!("pixel coordinates field is not an array");
        return Vec::new();
    };
    let parsed: Vec<LatLng> = points.iter().filter_map(LatLng::from_json_pair).collect();
    if parsed.len() < points.len() {
        log::debug!(
            "skipped {} malformed pixel coordinates",
            points.len() - parsed.len()
        );
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn growth_response() -> AnalysisResponse {
        AnalysisResponse::new(json!({
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [[[73.80, 18.50], [73.81, 18.50], [73.805, 18.51], [73.80, 18.50]]]},
                "properties": {"area_acres": 2.4, "tile_url": "https://tiles.example/{z}/{x}/{y}.png"}
            }],
            "pixel_summary": {
                "weak_pixel_percentage": 10.4,
                "weak_pixel_coordinates": [[73.8010, 18.5010]],
                "stress_pixel_percentage": "4.6",
                "moderate_pixel_percentage": 20.0,
                "moderate_pixel_coordinates": [[73.8020, 18.5020], [73.8021], "bad", [73.8022, 18.5022]],
                "healthy_pixel_percentage": 65.0,
                "healthy_pixel_coordinates": [[73.8030, 18.5030]]
            }
        }))
    }

    #[test]
    fn test_parse_growth_layer() {
        let layer = AnalysisLayer::from_response(LayerKind::Growth, &growth_response());
        assert!(layer.has_summary());
        let labels: Vec<_> = layer.buckets.iter().map(|b| b.label()).collect();
        assert_eq!(labels, ["Weak", "Stress", "Moderate", "Healthy"]);

        assert_eq!(layer.bucket("Stress").unwrap().percentage, 4.6);
        assert!(layer.bucket("Stress").unwrap().coordinates.is_empty());
        // two malformed points dropped
        assert_eq!(layer.bucket("Moderate").unwrap().coordinates.len(), 2);
        assert_eq!(layer.pixel_count(), 4);

        assert!(layer.boundary.is_some());
        assert!(layer.tile_url.is_some());
        assert_eq!(layer.area_acres, Some(2.4));
    }

    #[test]
    fn test_water_uptake_reads_service_spelling() {
        let response = AnalysisResponse::new(json!({
            "pixel_summary": {
                "adequat_pixel_percentage": 40.0,
                "adequat_pixel_coordinates": [[1.0, 2.0]],
                "adequate_pixel_percentage": 99.0
            }
        }));
        let layer = AnalysisLayer::from_response(LayerKind::WaterUptake, &response);
        let adequate = layer.bucket("Adequate").unwrap();
        assert_eq!(adequate.percentage, 40.0);
        assert_eq!(adequate.coordinates, vec![LatLng::new(2.0, 1.0)]);
    }

    #[test]
    fn test_soil_moisture_shallow_water_fields() {
        let response = AnalysisResponse::new(json!({
            "pixel_summary": {
                "shallow_water_pixel_percentage": 3.0,
                "shallow_water_pixel_coordinates": [[1.0, 2.0]],
                "adequate_pixel_percentage": 50.0
            }
        }));
        let layer = AnalysisLayer::from_response(LayerKind::SoilMoisture, &response);
        assert_eq!(layer.bucket("Shallow").unwrap().percentage, 3.0);
        assert_eq!(layer.bucket("Shallow").unwrap().coordinates.len(), 1);
        assert_eq!(layer.bucket("Adequate").unwrap().percentage, 50.0);
    }

    #[test]
    fn test_missing_summary_yields_empty_layer() {
        let layer = AnalysisLayer::from_response(LayerKind::Pest, &AnalysisResponse::empty());
        assert!(!layer.has_summary());
        assert!(layer.index().is_empty());
        assert!(layer.tile_url.is_none());
        assert!(layer.boundary.is_none());
    }

    #[test]
    fn test_percentage_parsing() {
        assert_eq!(parse_percentage(&json!(12.5)), Some(12.5));
        assert_eq!(parse_percentage(&json!(" 33 %")), Some(33.0));
        assert_eq!(parse_percentage(&json!(140)), Some(100.0));
        assert_eq!(parse_percentage(&json!("n/a")), None);
        assert_eq!(parse_percentage(&json!(null)), None);
        assert_eq!(round_percentage(64.5), 65);
        assert_eq!(round_percentage(f64::NAN), 0);
    }

    #[test]
    fn test_coordinates_field_not_an_array() {
        assert!(parse_coordinates(&json!({"lon": 1.0})).is_empty());
    }
}
