//! Per-image metadata records and the merged metadata table.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::catalog::CatalogImage;
use crate::error::Result;
use crate::geometry;
use crate::naming;
use crate::types::{Catalog, ExportFormat};

/// Column order of the metadata table
pub const COLUMNS: [&str; 5] = ["uri", "lat", "lon", "tstamp", "source"];

/// One row of the metadata table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadataRecord {
    /// `gs://` URI of the exported GeoTIFF
    pub uri: String,
    pub lat: f64,
    pub lon: f64,
    /// Acquisition time, `YYYY-MM-ddTHH:mm:ss` UTC
    pub tstamp: String,
    /// Catalog tag (`S2`, `L9`)
    pub source: String,
}

impl ImageMetadataRecord {
    /// Build the record for `image`, pointing at the object its export writes
    pub fn from_image(
        image: &CatalogImage,
        catalog: Catalog,
        bucket: &str,
        folder: &str,
    ) -> Result<Self> {
        let tag = catalog.source_tag();
        let name = naming::export_name(tag, &image.start_time);
        let (lon, lat) = geometry::centroid(&image.geometry)?;

        Ok(Self {
            uri: naming::gcs_uri(bucket, folder, &name, ExportFormat::GeoTiff.extension()),
            lat,
            lon,
            tstamp: naming::iso_timestamp(&image.start_time),
            source: tag.to_string(),
        })
    }
}

/// Ordered collection of metadata records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    records: Vec<ImageMetadataRecord>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ImageMetadataRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ImageMetadataRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append every record of `other` after this table's records.
    ///
    /// Nothing is dropped. Records sharing a URI are kept and reported, since
    /// their exports would overwrite the same object.
    pub fn merge(mut self, other: MetadataTable) -> Self {
        for uri in self.collisions_with(&other) {
            warn!("Multiple scenes map to the same export object: {}", uri);
        }
        self.records.extend(other.records);
        self
    }

    /// URIs of `incoming` that would collide once appended: already present
    /// here, or repeated within `incoming`. Each is listed once.
    pub fn collisions_with<'a>(&self, incoming: &'a MetadataTable) -> Vec<&'a str> {
        let mut seen: HashSet<&str> = self.records.iter().map(|r| r.uri.as_str()).collect();
        let mut reported = HashSet::new();
        let mut collisions = Vec::new();
        for record in &incoming.records {
            let uri = record.uri.as_str();
            if !seen.insert(uri) && reported.insert(uri) {
                collisions.push(uri);
            }
        }
        collisions
    }

    /// URIs appearing more than once, in first-seen order
    pub fn duplicate_uris(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.records
            .iter()
            .map(|r| r.uri.as_str())
            .filter(|uri| !seen.insert(*uri) && reported.insert(*uri))
            .collect()
    }

    /// Write the table as CSV with a `uri,lat,lon,tstamp,source` header
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        // Header is written explicitly so an empty table still has one
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv.write_record(COLUMNS)?;
        for record in &self.records {
            csv.serialize(record)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write `<dir>/<name>.csv`, creating `dir` if needed
    pub fn save_csv(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.{}", name, ExportFormat::Csv.extension()));
        let file = fs::File::create(&path)?;
        self.write_csv(file)?;
        debug!("Wrote {} metadata rows to {:?}", self.len(), path);
        Ok(path)
    }
}

impl FromIterator<ImageMetadataRecord> for MetadataTable {
    fn from_iter<I: IntoIterator<Item = ImageMetadataRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scene() -> CatalogImage {
        CatalogImage {
            id: "COPERNICUS/S2_SR/20250705T093041_20250705T093041_T35TMK".to_string(),
            start_time: "2025-07-05T09:30:41.512Z".parse().unwrap(),
            geometry: json!({
                "type": "Polygon",
                "coordinates": [[[24.0, 45.0], [25.0, 45.0], [25.0, 46.0], [24.0, 46.0], [24.0, 45.0]]]
            }),
            properties: Default::default(),
        }
    }

    fn record(uri: &str, source: &str) -> ImageMetadataRecord {
        ImageMetadataRecord {
            uri: uri.to_string(),
            lat: 45.5,
            lon: 24.5,
            tstamp: "2025-07-05T09:30:41".to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn test_record_from_image() {
        let record =
            ImageMetadataRecord::from_image(&scene(), Catalog::Sentinel2, "bucket-a", "gee_export")
                .unwrap();
        assert_eq!(record.uri, "gs://bucket-a/gee_export/S2_20250705_093041.tif");
        assert_eq!(record.tstamp, "2025-07-05T09:30:41");
        assert_eq!(record.source, "S2");
        assert!((record.lon - 24.5).abs() < 1e-9);
        assert!((record.lat - 45.5).abs() < 1e-9);
    }

    #[test]
    fn test_record_from_image_bad_footprint() {
        let mut image = scene();
        image.geometry = json!({ "type": "LineString", "coordinates": [[0, 0], [1, 1]] });
        assert!(ImageMetadataRecord::from_image(&image, Catalog::Landsat9, "b-1", "f").is_err());
    }

    #[test]
    fn test_merge_preserves_order_and_count() {
        let s2: MetadataTable = vec![record("gs://b/f/S2_1.tif", "S2"), record("gs://b/f/S2_2.tif", "S2")]
            .into_iter()
            .collect();
        let l9: MetadataTable = vec![record("gs://b/f/L9_1.tif", "L9")].into_iter().collect();

        let merged = s2.merge(l9);
        let uris: Vec<&str> = merged.records().iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec!["gs://b/f/S2_1.tif", "gs://b/f/S2_2.tif", "gs://b/f/L9_1.tif"]
        );
        assert!(merged.duplicate_uris().is_empty());
    }

    #[test]
    fn test_merge_keeps_colliding_uris() {
        let a: MetadataTable = vec![record("gs://b/f/S2_1.tif", "S2")].into_iter().collect();
        let b: MetadataTable = vec![
            record("gs://b/f/S2_1.tif", "S2"),
            record("gs://b/f/S2_1.tif", "S2"),
        ]
        .into_iter()
        .collect();
        let merged = a.merge(b);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.duplicate_uris(), vec!["gs://b/f/S2_1.tif"]);
    }

    #[test]
    fn test_collisions_only_report_incoming_uris() {
        // S2_1 already collides inside the first table
        let first: MetadataTable = vec![
            record("gs://b/f/S2_1.tif", "S2"),
            record("gs://b/f/S2_1.tif", "S2"),
        ]
        .into_iter()
        .collect();
        let clean: MetadataTable = vec![record("gs://b/f/L9_1.tif", "L9")].into_iter().collect();
        assert!(first.collisions_with(&clean).is_empty());

        let merged = first.merge(clean);
        let incoming: MetadataTable = vec![
            record("gs://b/f/L9_1.tif", "L9"),
            record("gs://b/f/L9_2.tif", "L9"),
            record("gs://b/f/L9_2.tif", "L9"),
            record("gs://b/f/L9_1.tif", "L9"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            merged.collisions_with(&incoming),
            vec!["gs://b/f/L9_1.tif", "gs://b/f/L9_2.tif"]
        );
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let table: MetadataTable = vec![record("gs://b/f/S2_1.tif", "S2")].into_iter().collect();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "uri,lat,lon,tstamp,source\ngs://b/f/S2_1.tif,45.5,24.5,2025-07-05T09:30:41,S2\n"
        );
    }

    #[test]
    fn test_write_csv_empty_table_has_header() {
        let mut out = Vec::new();
        MetadataTable::new().write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "uri,lat,lon,tstamp,source\n");
    }

    #[test]
    fn test_save_csv_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out");
        let table: MetadataTable = vec![record("gs://b/f/L9_1.tif", "L9")].into_iter().collect();

        let path = table.save_csv(&nested, "all_metadata").unwrap();
        assert_eq!(path, nested.join("all_metadata.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<ImageMetadataRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, table.records());
    }
}
