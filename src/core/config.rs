//! Configuration for the overlay engine and its analysis collaborator
//!
//! Both structs deserialize from JSON so a host application can ship a config
//! file next to its binary; every field has a default.

use crate::core::constants::{
    COORDINATE_TOLERANCE_DEG, ISOLATE_COVERAGE_THRESHOLD, MIN_PIXEL_SPACING_DEG, PAGE_STEP_DAYS,
    SETTLE_POLL_INTERVAL_MS,
};
use crate::layers::kind::LayerKind;
use crate::prelude::HashMap;
use crate::{FieldError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub page_step_days: u32,
    pub coordinate_tolerance_deg: f64,
    pub min_pixel_spacing_deg: f64,
    pub isolate_coverage_threshold: f64,
    pub default_layer: LayerKind,
    pub settle_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_step_days: PAGE_STEP_DAYS,
            coordinate_tolerance_deg: COORDINATE_TOLERANCE_DEG,
            min_pixel_spacing_deg: MIN_PIXEL_SPACING_DEG,
            isolate_coverage_threshold: ISOLATE_COVERAGE_THRESHOLD,
            default_layer: LayerKind::Growth,
            settle_poll_interval_ms: SETTLE_POLL_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Rejects settings that would make paging stall or let the coordinate
    /// matcher bleed into neighbouring pixels.
    pub fn validate(&self) -> Result<()> {
        if self.page_step_days == 0 {
            return Err(FieldError::InvalidConfig("page_step_days must be at least 1".into()).into());
        }
        if !(self.coordinate_tolerance_deg > 0.0) {
            return Err(FieldError::InvalidConfig(format!(
                "coordinate_tolerance_deg must be positive, got {}",
                self.coordinate_tolerance_deg
            ))
            .into());
        }
        if self.coordinate_tolerance_deg * 2.0 >= self.min_pixel_spacing_deg {
            return Err(FieldError::InvalidConfig(format!(
                "coordinate_tolerance_deg {} must be below half the pixel spacing {}",
                self.coordinate_tolerance_deg, self.min_pixel_spacing_deg
            ))
            .into());
        }
        if !(0.0..=100.0).contains(&self.isolate_coverage_threshold) {
            return Err(FieldError::InvalidConfig(format!(
                "isolate_coverage_threshold must be within 0..=100, got {}",
                self.isolate_coverage_threshold
            ))
            .into());
        }
        Ok(())
    }
}

/// Where and how to reach the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Per-kind path overrides; kinds not listed use [`LayerKind::endpoint`].
    pub endpoints: HashMap<LayerKind, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
            user_agent: concat!("fieldmap/", env!("CARGO_PKG_VERSION")).to_string(),
            endpoints: HashMap::default(),
        }
    }
}

impl SourceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.base_url.trim().is_empty() {
            return Err(FieldError::InvalidConfig("base_url must not be empty".into()).into());
        }
        Ok(config)
    }

    pub fn endpoint(&self, kind: LayerKind) -> &str {
        self.endpoints
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.endpoint())
    }

    /// Joins `base_url` and a path without doubling slashes.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_step_days, 15);
        assert_eq!(config.default_layer, LayerKind::Growth);
    }

    #[test]
    fn test_tolerance_must_stay_below_half_pixel_spacing() {
        let config = EngineConfig {
            coordinate_tolerance_deg: 0.00005,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            coordinate_tolerance_deg: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_config_rejects_zero_step_and_bad_threshold() {
        let zero_step = EngineConfig {
            page_step_days: 0,
            ..EngineConfig::default()
        };
        assert!(zero_step.validate().is_err());

        let threshold = EngineConfig {
            isolate_coverage_threshold: 120.0,
            ..EngineConfig::default()
        };
        assert!(threshold.validate().is_err());
    }

    #[test]
    fn test_engine_config_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"page_step_days": 7, "default_layer": "soil_moisture"}"#)
                .unwrap();
        assert_eq!(config.page_step_days, 7);
        assert_eq!(config.default_layer, LayerKind::SoilMoisture);
        assert_eq!(config.coordinate_tolerance_deg, COORDINATE_TOLERANCE_DEG);
    }

    #[test]
    fn test_source_config_endpoints_and_urls() {
        let config = SourceConfig::from_json_str(
            r#"{"base_url": "https://api.example.com/", "endpoints": {"pest": "v2/pest"}}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint(LayerKind::Pest), "v2/pest");
        assert_eq!(config.endpoint(LayerKind::Growth), LayerKind::Growth.endpoint());
        assert_eq!(
            config.url("/analyze/growth"),
            "https://api.example.com/analyze/growth"
        );
        assert!(SourceConfig::from_json_str(r#"{"base_url": " "}"#).is_err());
    }
}
