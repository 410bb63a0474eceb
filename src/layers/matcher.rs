//! Coordinate to class lookup, within one layer or across all loaded layers.

use crate::core::constants::COORDINATE_TOLERANCE_DEG;
use crate::core::geo::LatLng;
use crate::layers::analysis::AnalysisLayer;
use crate::layers::kind::{LayerKind, PixelClass};
use serde::Serialize;

/// One line of the hover tooltip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipEntry {
    pub layer_kind: LayerKind,
    pub label: &'static str,
    pub description: &'static str,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMatcher {
    tolerance: f64,
}

impl CoordinateMatcher {
    /// `tolerance` is compared per axis and must stay well below pixel spacing.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// The class of `layer` holding a pixel at `coordinate`.
    ///
    /// Classes are tried in canonical order, so if a malformed payload lists
    /// a pixel twice the earlier class wins.
    pub fn find_class(&self, layer: &AnalysisLayer, coordinate: &LatLng) -> Option<&'static PixelClass> {
        if !coordinate.lat.is_finite() || !coordinate.lng.is_finite() {
            return None;
        }
        let index = layer.index().lookup(coordinate, self.tolerance)?;
        layer.buckets.get(index).map(|bucket| bucket.class)
    }

    /// Runs [`find_class`](Self::find_class) over every loaded layer, in
    /// [`LayerKind::ALL`] order. Absent kinds are skipped.
    pub fn find_all_layers<'a, I>(&self, layers: I, coordinate: &LatLng) -> Vec<TooltipEntry>
    where
        I: IntoIterator<Item = &'a AnalysisLayer>,
    {
        let mut layers: Vec<&AnalysisLayer> = layers.into_iter().collect();
        layers.sort_by_key(|layer| layer.kind);

        layers
            .into_iter()
            .filter_map(|layer| {
                let class = self.find_class(layer, coordinate)?;
                let percentage = layer
                    .bucket(class.label)
                    .map(|bucket| bucket.rounded_percentage())
                    .unwrap_or(0);
                Some(TooltipEntry {
                    layer_kind: layer.kind,
                    label: class.label,
                    description: class.description,
                    percentage,
                })
            })
            .collect()
    }
}

impl Default for CoordinateMatcher {
    fn default() -> Self {
        Self::new(COORDINATE_TOLERANCE_DEG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::MIN_PIXEL_SPACING_DEG;
    use crate::data::response::AnalysisResponse;
    use serde_json::json;

    const BASE_LNG: f64 = 73.8500;
    const BASE_LAT: f64 = 18.5200;

    fn pixel(col: i32, row: i32) -> [f64; 2] {
        [
            BASE_LNG + col as f64 * MIN_PIXEL_SPACING_DEG,
            BASE_LAT + row as f64 * MIN_PIXEL_SPACING_DEG,
        ]
    }

    fn at(col: i32, row: i32) -> LatLng {
        LatLng::from_lng_lat(pixel(col, row))
    }

    fn growth() -> AnalysisLayer {
        AnalysisLayer::from_response(
            LayerKind::Growth,
            &AnalysisResponse::new(json!({
                "pixel_summary": {
                    "weak_pixel_percentage": 25.0,
                    "weak_pixel_coordinates": [pixel(0, 0)],
                    "stress_pixel_percentage": 25.0,
                    "stress_pixel_coordinates": [pixel(1, 0)],
                    "moderate_pixel_percentage": 25.0,
                    "moderate_pixel_coordinates": [pixel(0, 1)],
                    "healthy_pixel_percentage": 25.0,
                    "healthy_pixel_coordinates": [pixel(1, 1), pixel(2, 2)]
                }
            })),
        )
    }

    fn soil_moisture() -> AnalysisLayer {
        AnalysisLayer::from_response(
            LayerKind::SoilMoisture,
            &AnalysisResponse::new(json!({
                "pixel_summary": {
                    "excess_pixel_percentage": 12.0,
                    "excess_pixel_coordinates": [pixel(2, 2)],
                    "adequate_pixel_percentage": 88.0,
                    "adequate_pixel_coordinates": [pixel(0, 0)]
                }
            })),
        )
    }

    fn water_uptake() -> AnalysisLayer {
        AnalysisLayer::from_response(
            LayerKind::WaterUptake,
            &AnalysisResponse::new(json!({
                "pixel_summary": {
                    "adequat_pixel_percentage": 100.0,
                    "adequat_pixel_coordinates": [pixel(5, 5)]
                }
            })),
        )
    }

    #[test]
    fn test_every_bucket_coordinate_maps_to_its_class() {
        let matcher = CoordinateMatcher::default();
        let layer = growth();
        for bucket in &layer.buckets {
            for coordinate in &bucket.coordinates {
                assert_eq!(
                    matcher.find_class(&layer, coordinate).map(|c| c.label),
                    Some(bucket.label())
                );
            }
        }
    }

    #[test]
    fn test_absent_coordinate_has_no_match() {
        let matcher = CoordinateMatcher::default();
        assert!(matcher.find_class(&growth(), &at(7, 7)).is_none());
        assert!(matcher
            .find_class(&growth(), &LatLng::new(f64::NAN, BASE_LNG))
            .is_none());
    }

    #[test]
    fn test_adjacent_pixels_do_not_bleed() {
        let matcher = CoordinateMatcher::default();
        let layer = growth();
        // a query nudged just inside tolerance still resolves to its own pixel
        let nudged = LatLng::new(at(1, 0).lat + 0.000009, at(1, 0).lng - 0.000009);
        assert_eq!(matcher.find_class(&layer, &nudged).unwrap().label, "Stress");
        // halfway between two neighbours matches neither
        let between = LatLng::new(
            BASE_LAT,
            BASE_LNG + MIN_PIXEL_SPACING_DEG / 2.0,
        );
        assert!(matcher.find_class(&layer, &between).is_none());
    }

    #[test]
    fn test_find_all_layers_orders_by_kind() {
        let matcher = CoordinateMatcher::default();
        let layers = [soil_moisture(), water_uptake(), growth()];
        let entries = matcher.find_all_layers(layers.iter(), &at(2, 2));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].layer_kind, LayerKind::Growth);
        assert_eq!(entries[0].label, "Healthy");
        assert_eq!(entries[0].percentage, 25);
        assert_eq!(entries[1].layer_kind, LayerKind::SoilMoisture);
        assert_eq!(entries[1].label, "Excess");
    }

    #[test]
    fn test_find_all_layers_tolerates_missing_layers() {
        let matcher = CoordinateMatcher::default();
        assert!(matcher.find_all_layers(std::iter::empty(), &at(0, 0)).is_empty());

        let only_water = [water_uptake()];
        let entries = matcher.find_all_layers(only_water.iter(), &at(5, 5));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Adequate");
    }
}
