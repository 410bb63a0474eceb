//! The four analysis layer kinds and their class taxonomies.
//!
//! Each kind owns a fixed, ordered class table. The order is canonical: legend
//! rows, coordinate matching and tooltip entries all follow it, so a legend
//! row index is also a lookup key.
//!
//! Summary field names are not uniform across endpoints (the water uptake
//! service writes `adequat_pixel_percentage`, soil moisture writes
//! `shallow_water_pixel_percentage`), so every class lists the prefixes it is
//! stored under, canonical first.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Growth,
    WaterUptake,
    SoilMoisture,
    Pest,
}

/// One class of a layer's taxonomy.
#[derive(Debug, PartialEq, Eq)]
pub struct PixelClass {
    pub label: &'static str,
    /// `<prefix>_pixel_percentage` / `<prefix>_pixel_coordinates`
    pub prefixes: &'static [&'static str],
    pub color: &'static str,
    pub description: &'static str,
}

impl PixelClass {
    pub fn percentage_field(prefix: &str) -> String {
        format!("{}_pixel_percentage", prefix)
    }

    pub fn coordinates_field(prefix: &str) -> String {
        format!("{}_pixel_coordinates", prefix)
    }
}

const GROWTH_CLASSES: &[PixelClass] = &[
    PixelClass {
        label: "Weak",
        prefixes: &["weak"],
        color: "#EF4444",
        description: "Weak growth: sparse canopy, crop needs attention",
    },
    PixelClass {
        label: "Stress",
        prefixes: &["stress", "stressed"],
        color: "#F97316",
        description: "Stressed crop: growth below expected vigor",
    },
    PixelClass {
        label: "Moderate",
        prefixes: &["moderate"],
        color: "#FACC15",
        description: "Moderate growth: developing normally",
    },
    PixelClass {
        label: "Healthy",
        prefixes: &["healthy"],
        color: "#16A34A",
        description: "Healthy crop: dense, vigorous canopy",
    },
];

const WATER_UPTAKE_CLASSES: &[PixelClass] = &[
    PixelClass {
        label: "Deficient",
        prefixes: &["deficient"],
        color: "#DC2626",
        description: "Deficient uptake: crop is not drawing enough water",
    },
    PixelClass {
        label: "Less",
        prefixes: &["less"],
        color: "#F59E0B",
        description: "Less uptake: below the crop's requirement",
    },
    PixelClass {
        label: "Adequate",
        prefixes: &["adequat", "adequate"],
        color: "#22C55E",
        description: "Adequate uptake: water demand is met",
    },
    PixelClass {
        label: "Excellent",
        prefixes: &["excellent"],
        color: "#0EA5E9",
        description: "Excellent uptake: optimal water use",
    },
    PixelClass {
        label: "Excess",
        prefixes: &["excess"],
        color: "#1D4ED8",
        description: "Excess uptake: more water than the crop needs",
    },
];

const SOIL_MOISTURE_CLASSES: &[PixelClass] = &[
    PixelClass {
        label: "Less",
        prefixes: &["less"],
        color: "#B45309",
        description: "Less moisture: soil is drying out",
    },
    PixelClass {
        label: "Adequate",
        prefixes: &["adequate", "adequat"],
        color: "#84CC16",
        description: "Adequate moisture: enough for the root zone",
    },
    PixelClass {
        label: "Excellent",
        prefixes: &["excellent"],
        color: "#14B8A6",
        description: "Excellent moisture: ideal soil water content",
    },
    PixelClass {
        label: "Excess",
        prefixes: &["excess"],
        color: "#2563EB",
        description: "Excess moisture: risk of waterlogging",
    },
    PixelClass {
        label: "Shallow",
        prefixes: &["shallow_water", "shallow"],
        color: "#7C3AED",
        description: "Shallow water: standing water near the surface",
    },
];

const PEST_CLASSES: &[PixelClass] = &[
    PixelClass {
        label: "Chewing",
        prefixes: &["chewing"],
        color: "#DC2626",
        description: "Chewing pests: leaf and stem feeders",
    },
    PixelClass {
        label: "Sucking",
        prefixes: &["sucking"],
        color: "#EA580C",
        description: "Sucking pests: sap feeders such as aphids and whiteflies",
    },
    PixelClass {
        label: "Fungi",
        prefixes: &["fungi", "fungal"],
        color: "#9333EA",
        description: "Fungal disease pressure",
    },
    PixelClass {
        label: "SoilBorne",
        prefixes: &["soil_borne", "soilborne"],
        color: "#78350F",
        description: "Soil-borne pathogens affecting roots",
    },
];

impl LayerKind {
    /// Fixed layer order used for tooltips and iteration.
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Growth,
        LayerKind::WaterUptake,
        LayerKind::SoilMoisture,
        LayerKind::Pest,
    ];

    /// Canonical class ordering for this kind.
    pub fn classes(&self) -> &'static [PixelClass] {
        match self {
            LayerKind::Growth => GROWTH_CLASSES,
            LayerKind::WaterUptake => WATER_UPTAKE_CLASSES,
            LayerKind::SoilMoisture => SOIL_MOISTURE_CLASSES,
            LayerKind::Pest => PEST_CLASSES,
        }
    }

    pub fn class(&self, label: &str) -> Option<&'static PixelClass> {
        self.classes().iter().find(|class| class.label == label)
    }

    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.classes().iter().position(|class| class.label == label)
    }

    /// Default analysis endpoint path.
    pub fn endpoint(&self) -> &'static str {
        match self {
            LayerKind::Growth => "analyze/growth",
            LayerKind::WaterUptake => "analyze/water-uptake",
            LayerKind::SoilMoisture => "analyze/soil-moisture",
            LayerKind::Pest => "analyze/pest-detection",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LayerKind::Growth => "Crop Growth",
            LayerKind::WaterUptake => "Water Uptake",
            LayerKind::SoilMoisture => "Soil Moisture",
            LayerKind::Pest => "Pest & Disease",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Growth => write!(f, "growth"),
            LayerKind::WaterUptake => write!(f, "water_uptake"),
            LayerKind::SoilMoisture => write!(f, "soil_moisture"),
            LayerKind::Pest => write!(f, "pest"),
        }
    }
}

impl std::str::FromStr for LayerKind {
    type Err = crate::FieldError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "growth" => Ok(LayerKind::Growth),
            "water_uptake" => Ok(LayerKind::WaterUptake),
            "soil_moisture" => Ok(LayerKind::SoilMoisture),
            "pest" | "pest_detection" => Ok(LayerKind::Pest),
            other => Err(crate::FieldError::Layer(format!("unknown layer kind '{}'", other))),
        }
    }
}
