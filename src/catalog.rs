//! Catalog queries and the cloud-cover filter.
//!
//! A query is sent as listing parameters (date window, region, property
//! filter, page size). The same cloud predicate is then re-applied locally so
//! the result never depends on how the server treats missing properties.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config_file::PullConfig;
use crate::geometry::Roi;
use crate::types::Catalog;

/// One catalog query: collection, region, window, cloud threshold and limit
#[derive(Debug, Clone, PartialEq)]
pub struct ImageQuery {
    pub catalog: Catalog,
    pub roi: Roi,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub max_cloud_cover: f64,
    pub limit: usize,
}

impl ImageQuery {
    /// Query for `catalog` using the window, region and limits of `config`
    pub fn from_config(catalog: Catalog, config: &PullConfig) -> Self {
        Self {
            catalog,
            roi: config.region.clone(),
            start: config.start_date,
            end: config.end_date,
            max_cloud_cover: config.max_cloud_cover,
            limit: config.limit,
        }
    }

    /// Server-side property filter, e.g. `properties.CLOUD_COVER < 10`
    pub fn filter_expression(&self) -> String {
        format!(
            "properties.{} < {}",
            self.catalog.cloud_property(),
            self.max_cloud_cover
        )
    }

    /// Listing query parameters
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("startTime", midnight_utc(self.start).to_rfc3339()),
            ("endTime", midnight_utc(self.end).to_rfc3339()),
            ("region", self.roi.to_geojson().to_string()),
            ("filter", self.filter_expression()),
            ("pageSize", self.limit.to_string()),
        ]
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// An image as returned by the catalog listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogImage {
    /// Asset id, e.g. `COPERNICUS/S2_SR/20250705T092041_..._T34TFQ`
    pub id: String,
    /// Acquisition start time
    pub start_time: DateTime<Utc>,
    /// Footprint as GeoJSON
    pub geometry: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl CatalogImage {
    /// Numeric value of an image property, if present
    pub fn number(&self, property: &str) -> Option<f64> {
        self.properties.get(property).and_then(Value::as_f64)
    }
}

/// One page of a listing response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImagesResponse {
    #[serde(default)]
    pub images: Vec<CatalogImage>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// The cloud property is present, numeric and strictly below `threshold`
pub fn matches_cloud_filter(image: &CatalogImage, catalog: Catalog, threshold: f64) -> bool {
    image
        .number(catalog.cloud_property())
        .is_some_and(|cover| cover < threshold)
}

/// Apply the local cloud filter and truncate to the query limit, keeping
/// catalog order.
pub fn select_images(images: Vec<CatalogImage>, query: &ImageQuery) -> Vec<CatalogImage> {
    images
        .into_iter()
        .filter(|image| matches_cloud_filter(image, query.catalog, query.max_cloud_cover))
        .take(query.limit)
        .collect()
}
