//! Type-safe export task contracts.
//!
//! Each export the tool submits is a struct implementing [`ExportTask`]. The
//! struct owns the mapping to the platform's request body, so the expression
//! graph, file format and Cloud Storage destination are built in one place.
//!
//! Expressions use the platform's serialized graph form: a `values` map of
//! nodes plus the key of the `result` node. The graphs built here are single
//! nested trees rooted at node `"0"`.

use serde_json::{Map, Value, json};

use crate::catalog::CatalogImage;
use crate::geometry::Roi;
use crate::metadata::{COLUMNS, ImageMetadataRecord, MetadataTable};
use crate::naming;
use crate::types::{Catalog, ExportFormat};

/// Pixel cap passed with image exports; the default cap is too small for a
/// country-sized region at 10 m.
pub const MAX_PIXELS: u64 = 10_000_000_000_000;

/// Description of the merged metadata table export
pub const TABLE_EXPORT_DESCRIPTION: &str = "All_Metadata_Export";

/// Trait for typed export requests.
///
/// # Contract
///
/// - `endpoint()`: project-relative method path, e.g. `image:export`.
/// - `description()`: task description shown in the platform's task list.
/// - `to_request_body()`: JSON body exactly as the export method expects it.
///
/// # Invariants
///
/// - The destination written by the platform is
///   `gs://<bucket>/<object_prefix()>.<format().extension()>`.
pub trait ExportTask {
    /// Method path relative to `projects/<project>/`
    fn endpoint(&self) -> &'static str;

    /// Task description
    fn description(&self) -> &str;

    /// Output file format
    fn format(&self) -> ExportFormat;

    /// Destination bucket
    fn bucket(&self) -> &str;

    /// Object name prefix inside the bucket
    fn object_prefix(&self) -> &str;

    /// Request body for the export method
    fn to_request_body(&self) -> Value;

    /// `gs://` URI of the object the task writes
    fn destination_uri(&self) -> String {
        format!(
            "gs://{}/{}.{}",
            self.bucket(),
            self.object_prefix(),
            self.format().extension()
        )
    }
}

/// GeoTIFF export of one catalog image, clipped to the region
#[derive(Debug, Clone, PartialEq)]
pub struct ImageExportTask {
    pub image_id: String,
    pub bands: Vec<String>,
    pub region: Roi,
    pub scale: f64,
    pub bucket: String,
    name: String,
    prefix: String,
}

impl ImageExportTask {
    pub fn new(
        image: &CatalogImage,
        catalog: Catalog,
        region: &Roi,
        scale: f64,
        bucket: &str,
        folder: &str,
    ) -> Self {
        let name = naming::export_name(catalog.source_tag(), &image.start_time);
        let prefix = naming::object_prefix(folder, &name);
        Self {
            image_id: image.id.clone(),
            bands: catalog.bands().iter().map(|b| b.to_string()).collect(),
            region: region.clone(),
            scale,
            bucket: bucket.to_string(),
            name,
            prefix,
        }
    }

    /// `Image.clipToBoundsAndScale(Image.select(Image.load(id), bands), region, scale)`
    pub fn expression(&self) -> Value {
        let load = invocation("Image.load", json!({ "id": constant(json!(self.image_id)) }));
        let select = invocation(
            "Image.select",
            json!({
                "input": load,
                "bandSelectors": constant(json!(self.bands)),
            }),
        );
        let geometry = invocation(
            "GeometryConstructors.Polygon",
            json!({ "coordinates": constant(self.region.to_geojson()["coordinates"].clone()) }),
        );
        let clipped = invocation(
            "Image.clipToBoundsAndScale",
            json!({
                "input": select,
                "geometry": geometry,
                "scale": constant(json!(self.scale)),
            }),
        );
        graph(clipped)
    }
}

impl ExportTask for ImageExportTask {
    fn endpoint(&self) -> &'static str {
        "image:export"
    }

    fn description(&self) -> &str {
        &self.name
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::GeoTiff
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_prefix(&self) -> &str {
        &self.prefix
    }

    fn to_request_body(&self) -> Value {
        json!({
            "expression": self.expression(),
            "description": self.description(),
            "fileExportOptions": file_export_options(self.format(), &self.bucket, &self.prefix),
            "maxPixels": MAX_PIXELS.to_string(),
        })
    }
}

/// CSV export of the merged metadata table
#[derive(Debug, Clone, PartialEq)]
pub struct TableExportTask {
    pub records: Vec<ImageMetadataRecord>,
    pub bucket: String,
    prefix: String,
}

impl TableExportTask {
    pub fn new(table: &MetadataTable, bucket: &str, folder: &str, name: &str) -> Self {
        Self {
            records: table.records().to_vec(),
            bucket: bucket.to_string(),
            prefix: naming::object_prefix(folder, name),
        }
    }

    /// `Collection([Feature(null, record)…])`
    pub fn expression(&self) -> Value {
        let features: Vec<Value> = self
            .records
            .iter()
            .map(|record| {
                let mut metadata = Map::new();
                metadata.insert("uri".into(), json!(record.uri));
                metadata.insert("lat".into(), json!(record.lat));
                metadata.insert("lon".into(), json!(record.lon));
                metadata.insert("tstamp".into(), json!(record.tstamp));
                metadata.insert("source".into(), json!(record.source));
                invocation(
                    "Feature",
                    json!({ "metadata": constant(Value::Object(metadata)) }),
                )
            })
            .collect();
        let collection = invocation(
            "Collection",
            json!({ "features": { "arrayValue": { "values": features } } }),
        );
        graph(collection)
    }
}

impl ExportTask for TableExportTask {
    fn endpoint(&self) -> &'static str {
        "table:export"
    }

    fn description(&self) -> &str {
        TABLE_EXPORT_DESCRIPTION
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_prefix(&self) -> &str {
        &self.prefix
    }

    fn to_request_body(&self) -> Value {
        json!({
            "expression": self.expression(),
            "description": self.description(),
            "fileExportOptions": file_export_options(self.format(), &self.bucket, &self.prefix),
            "selectors": COLUMNS,
        })
    }
}

fn file_export_options(format: ExportFormat, bucket: &str, prefix: &str) -> Value {
    json!({
        "fileFormat": format.to_string(),
        "gcsDestination": {
            "bucket": bucket,
            "filenamePrefix": prefix,
        },
    })
}

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

fn invocation(function: &str, arguments: Value) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

fn graph(root: Value) -> Value {
    json!({ "result": "0", "values": { "0": root } })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> CatalogImage {
        CatalogImage {
            id: "LANDSAT/LC09/C02/T1_L2/LC09_183029_20250705".to_string(),
            start_time: "2025-07-05T09:02:11Z".parse().unwrap(),
            geometry: json!({ "type": "Polygon", "coordinates": [] }),
            properties: Default::default(),
        }
    }

    fn region() -> Roi {
        Roi::rectangle(23.0, 44.0, 27.0, 47.0).unwrap()
    }

    #[test]
    fn test_image_export_names() {
        let task = ImageExportTask::new(&scene(), Catalog::Landsat9, &region(), 10.0, "bkt", "gee_export");
        assert_eq!(task.description(), "L9_20250705_090211");
        assert_eq!(task.object_prefix(), "gee_export/L9_20250705_090211");
        assert_eq!(
            task.destination_uri(),
            "gs://bkt/gee_export/L9_20250705_090211.tif"
        );
        assert_eq!(task.endpoint(), "image:export");
    }

    #[test]
    fn test_image_export_body() {
        let task = ImageExportTask::new(&scene(), Catalog::Landsat9, &region(), 10.0, "bkt", "gee_export");
        let body = task.to_request_body();

        assert_eq!(body["fileExportOptions"]["fileFormat"], "GEO_TIFF");
        assert_eq!(body["fileExportOptions"]["gcsDestination"]["bucket"], "bkt");
        assert_eq!(
            body["fileExportOptions"]["gcsDestination"]["filenamePrefix"],
            "gee_export/L9_20250705_090211"
        );
        assert_eq!(body["maxPixels"], "10000000000000");

        let root = &body["expression"]["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "Image.clipToBoundsAndScale");
        assert_eq!(root["arguments"]["scale"]["constantValue"], 10.0);

        let select = &root["arguments"]["input"]["functionInvocationValue"];
        assert_eq!(select["functionName"], "Image.select");
        assert_eq!(
            select["arguments"]["bandSelectors"]["constantValue"],
            json!(["SR_B4", "SR_B3", "SR_B2"])
        );
        let load = &select["arguments"]["input"]["functionInvocationValue"];
        assert_eq!(load["functionName"], "Image.load");
        assert_eq!(
            load["arguments"]["id"]["constantValue"],
            "LANDSAT/LC09/C02/T1_L2/LC09_183029_20250705"
        );

        let polygon = &root["arguments"]["geometry"]["functionInvocationValue"];
        assert_eq!(polygon["functionName"], "GeometryConstructors.Polygon");
        assert_eq!(
            polygon["arguments"]["coordinates"]["constantValue"][0][2],
            json!([27.0, 47.0])
        );
    }

    #[test]
    fn test_table_export_body() {
        let record = ImageMetadataRecord {
            uri: "gs://bkt/gee_export/S2_20250705_093041.tif".to_string(),
            lat: 45.5,
            lon: 24.5,
            tstamp: "2025-07-05T09:30:41".to_string(),
            source: "S2".to_string(),
        };
        let table: MetadataTable = vec![record].into_iter().collect();
        let task = TableExportTask::new(&table, "bkt", "gee_export", "all_metadata");

        assert_eq!(task.destination_uri(), "gs://bkt/gee_export/all_metadata.csv");
        assert_eq!(task.endpoint(), "table:export");

        let body = task.to_request_body();
        assert_eq!(body["description"], "All_Metadata_Export");
        assert_eq!(body["fileExportOptions"]["fileFormat"], "CSV");
        assert_eq!(body["selectors"], json!(["uri", "lat", "lon", "tstamp", "source"]));

        let collection = &body["expression"]["values"]["0"]["functionInvocationValue"];
        assert_eq!(collection["functionName"], "Collection");
        let features = collection["arguments"]["features"]["arrayValue"]["values"]
            .as_array()
            .unwrap();
        assert_eq!(features.len(), 1);
        let metadata = &features[0]["functionInvocationValue"]["arguments"]["metadata"]["constantValue"];
        assert_eq!(metadata["uri"], "gs://bkt/gee_export/S2_20250705_093041.tif");
        assert_eq!(metadata["source"], "S2");
    }
}
