//! Configuration file handling for saving and loading pull configs.
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names and running without a file pulls the stock Romania / July 2025 set.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::geometry::Roi;
use crate::types::Catalog;

/// Data pull configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    // Platform
    pub project: String,

    // Query
    pub region: Roi,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate, // Exclusive
    pub catalogs: Vec<Catalog>,
    pub max_cloud_cover: f64,
    pub limit: usize, // Per catalog

    // Export
    pub bucket: String,
    pub folder: String, // Object prefix inside the bucket
    pub scale: f64,     // Metres per pixel
    pub metadata_name: String,

    // Local copy of the metadata table
    pub output_dir: PathBuf,
}

impl PullConfig {
    /// Create a new configuration with the stock defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            anyhow::bail!("Earth Engine project must be specified");
        }

        validate_bucket_name(&self.bucket)?;

        if self.folder.starts_with('/') || self.folder.ends_with('/') {
            anyhow::bail!("Folder must not start or end with '/'");
        }

        if self.start_date >= self.end_date {
            anyhow::bail!(
                "Start date {} must be before end date {}",
                self.start_date,
                self.end_date
            );
        }

        if self.limit == 0 {
            anyhow::bail!("Per-catalog limit must be at least 1");
        }

        if !(self.max_cloud_cover > 0.0 && self.max_cloud_cover <= 100.0) {
            anyhow::bail!("Cloud cover threshold must be in (0, 100]");
        }

        if !(self.scale.is_finite() && self.scale > 0.0) {
            anyhow::bail!("Export scale must be a positive number of metres");
        }

        if self.catalogs.is_empty() {
            anyhow::bail!("At least one catalog must be selected");
        }
        let mut seen = HashSet::new();
        for catalog in &self.catalogs {
            if !seen.insert(catalog) {
                anyhow::bail!("Catalog {} is listed more than once", catalog);
            }
        }

        if self.metadata_name.trim().is_empty() || self.metadata_name.contains('/') {
            anyhow::bail!("Metadata table name must be non-empty and contain no '/'");
        }

        // Re-check the ring in case the struct was built in code
        Roi::new(self.region.vertices().to_vec())?;

        Ok(())
    }
}

/// Cloud Storage bucket naming rules (the subset that matters here)
fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.len() < 3 || bucket.len() > 63 {
        anyhow::bail!("Bucket name must be 3-63 characters long");
    }
    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        anyhow::bail!("Bucket name can only contain lowercase letters, digits, '-', '_' and '.'");
    }
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !alnum(bucket.chars().next()) || !alnum(bucket.chars().last()) {
        anyhow::bail!("Bucket name must start and end with a letter or digit");
    }
    Ok(())
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            project: "my-ee-project".to_string(),
            // Broad Romania region
            region: Roi::rectangle(23.0, 44.0, 27.0, 47.0)
                .expect("default region is a valid rectangle"),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid default start date"),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 31).expect("valid default end date"),
            catalogs: vec![Catalog::Sentinel2, Catalog::Landsat9],
            max_cloud_cover: 10.0,
            limit: 10,
            bucket: "my-earth-ai-bucket".to_string(),
            folder: "gee_export".to_string(),
            scale: 10.0,
            metadata_name: "all_metadata".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}
