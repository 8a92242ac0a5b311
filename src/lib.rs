//! scenepull library
//!
//! Queries the Sentinel-2 and Landsat 9 catalogs on Earth Engine, submits
//! GeoTIFF exports of cloud-free scenes to Cloud Storage and writes a merged
//! per-scene metadata table.

pub mod catalog;
pub mod cli;
pub mod config_file;
pub mod earth_engine;
pub mod error;
pub mod export;
pub mod geometry;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod types;

// Re-export main types for convenience
pub use catalog::{CatalogImage, ImageQuery, ListImagesResponse, matches_cloud_filter, select_images};
pub use config_file::PullConfig;
pub use earth_engine::{EarthEngineClient, Operation, Platform};
pub use error::PullError;
pub use export::{ExportTask, ImageExportTask, TableExportTask};
pub use geometry::Roi;
pub use metadata::{ImageMetadataRecord, MetadataTable};
pub use pipeline::{PullOptions, PullReport, run_pull};
pub use types::{Catalog, ExportFormat, TaskState};
