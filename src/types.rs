//! Type-safe catalog and export types for scenepull
//!
//! Collections, file formats and task states are enums rather than strings so
//! that asset ids, band lists and wire names live in exactly one place.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Imagery collections the tool knows how to query and export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Catalog {
    /// Sentinel-2 MSI Level-2A surface reflectance
    #[serde(rename = "S2")]
    #[strum(to_string = "S2", serialize = "sentinel2")]
    Sentinel2,
    /// Landsat 9 Collection 2 Tier 1 Level-2
    #[serde(rename = "L9")]
    #[strum(to_string = "L9", serialize = "landsat9")]
    Landsat9,
}

impl Catalog {
    /// Earth Engine asset id of the collection
    pub fn asset_id(&self) -> &'static str {
        match self {
            Self::Sentinel2 => "COPERNICUS/S2_SR",
            Self::Landsat9 => "LANDSAT/LC09/C02/T1_L2",
        }
    }

    /// Short tag used in export names and the `source` metadata column
    pub fn source_tag(&self) -> &'static str {
        match self {
            Self::Sentinel2 => "S2",
            Self::Landsat9 => "L9",
        }
    }

    /// True-colour bands (red, green, blue) selected for export
    pub fn bands(&self) -> &'static [&'static str] {
        match self {
            Self::Sentinel2 => &["B4", "B3", "B2"],
            Self::Landsat9 => &["SR_B4", "SR_B3", "SR_B2"],
        }
    }

    /// Image property holding the scene cloud percentage
    pub fn cloud_property(&self) -> &'static str {
        match self {
            Self::Sentinel2 => "CLOUDY_PIXEL_PERCENTAGE",
            Self::Landsat9 => "CLOUD_COVER",
        }
    }

    /// Human-readable collection name
    pub fn title(&self) -> &'static str {
        match self {
            Self::Sentinel2 => "Sentinel-2 MSI Level-2A",
            Self::Landsat9 => "Landsat 9 Collection 2 Level-2",
        }
    }
}

/// Output file format of an export task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
pub enum ExportFormat {
    #[serde(rename = "GEO_TIFF")]
    #[strum(serialize = "GEO_TIFF")]
    GeoTiff,
    #[serde(rename = "CSV")]
    #[strum(serialize = "CSV")]
    Csv,
}

impl ExportFormat {
    /// File extension the platform appends to the object prefix
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GeoTiff => "tif",
            Self::Csv => "csv",
        }
    }
}

/// Lifecycle state reported in an operation's metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Cancelling,
    Succeeded,
    Cancelled,
    Failed,
}

impl TaskState {
    /// Whether the task can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}
