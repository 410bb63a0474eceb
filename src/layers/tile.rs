//! Raster overlay tile URLs
//!
//! Analysis services return the tile template for their raster in different
//! places. [`resolve_tile_url`] walks an explicit, ordered candidate list and
//! validates the first string it finds; anything without `{z}`, `{x}` and `{y}`
//! placeholders is dropped so the map simply shows no raster for that layer.

use crate::core::constants::TILE_PLACEHOLDERS;
use crate::core::geo::TileCoord;
use crate::data::response::AnalysisResponse;
use crate::{FieldError, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Where a tile URL may live in an analysis response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileUrlLocation {
    /// `response[key]`
    TopLevel(&'static str),
    /// `response.features[0].properties[key]`
    FeatureProperty(&'static str),
    /// `response[key][0]`
    ArrayField(&'static str),
}

/// Candidates in lookup order.
pub const TILE_URL_CANDIDATES: &[TileUrlLocation] = &[
    TileUrlLocation::TopLevel("tile_url"),
    TileUrlLocation::TopLevel("tileUrl"),
    TileUrlLocation::FeatureProperty("tile_url"),
    TileUrlLocation::FeatureProperty("tileUrl"),
    TileUrlLocation::ArrayField("tiles"),
    TileUrlLocation::ArrayField("tile_urls"),
];

impl TileUrlLocation {
    pub fn lookup<'a>(&self, response: &'a AnalysisResponse) -> Option<&'a str> {
        let value: &Value = match self {
            TileUrlLocation::TopLevel(key) => response.field(key)?,
            TileUrlLocation::FeatureProperty(key) => response
                .first_feature_value()?
                .get("properties")?
                .get(key)?,
            TileUrlLocation::ArrayField(key) => response.field(key)?.as_array()?.first()?,
        };
        value.as_str().map(str::trim).filter(|url| !url.is_empty())
    }
}

/// A validated `{z}/{x}/{y}` tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl TileUrlTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let template = template.trim();
        if let Some(missing) = TILE_PLACEHOLDERS.iter().find(|p| !template.contains(**p)) {
            return Err(FieldError::Layer(format!(
                "tile url '{}' is missing the {} placeholder",
                template, missing
            ))
            .into());
        }
        Ok(Self {
            template: template.to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl TileSource for TileUrlTemplate {
    fn url(&self, coord: TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());
        if url.contains("{s}") && !self.subdomains.is_empty() {
            let idx = ((coord.x + coord.y) % self.subdomains.len() as u32) as usize;
            url = url.replace("{s}", &self.subdomains[idx]);
        }
        url
    }
}

impl std::fmt::Display for TileUrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

impl Serialize for TileUrlTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.template)
    }
}

/// First tile URL found in `response`, if it is a valid template.
pub fn resolve_tile_url(response: &AnalysisResponse) -> Option<TileUrlTemplate> {
    let candidate = TILE_URL_CANDIDATES
        .iter()
        .find_map(|location| location.lookup(response))?;
    match TileUrlTemplate::parse(candidate) {
        Ok(template) => Some(template),
        Err(e) => {
            log::warn!("ignoring tile layer: {}", e);
            None
        }
    }
}
