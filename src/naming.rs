//! Export names and Cloud Storage URIs.
//!
//! The image export and the metadata row for the same scene must agree on the
//! object name, so both go through these helpers.

use chrono::{DateTime, Utc};

/// Format of the date part of an export name (`YYYYMMdd_HHmmss`)
pub const EXPORT_DATE_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Format of the `tstamp` metadata column (`YYYY-MM-ddTHH:mm:ss`)
pub const ISO_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Export name for a scene: `<tag>_<YYYYMMdd_HHmmss>`
pub fn export_name(tag: &str, time: &DateTime<Utc>) -> String {
    format!("{}_{}", tag, time.format(EXPORT_DATE_FORMAT))
}

/// Object prefix inside the bucket: `<folder>/<name>`
pub fn object_prefix(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Full `gs://` URI of an exported object
pub fn gcs_uri(bucket: &str, folder: &str, name: &str, extension: &str) -> String {
    format!("gs://{}/{}.{}", bucket, object_prefix(folder, name), extension)
}

/// Acquisition time as written to the metadata table
pub fn iso_timestamp(time: &DateTime<Utc>) -> String {
    time.format(ISO_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 5, 9, 30, 41).unwrap()
    }

    #[test]
    fn test_export_name_format() {
        assert_eq!(export_name("S2", &sample_time()), "S2_20250705_093041");
        assert_eq!(export_name("L9", &sample_time()), "L9_20250705_093041");
    }

    #[test]
    fn test_object_prefix() {
        assert_eq!(object_prefix("gee_export", "S2_x"), "gee_export/S2_x");
        assert_eq!(object_prefix("", "S2_x"), "S2_x");
    }

    #[test]
    fn test_gcs_uri() {
        let name = export_name("S2", &sample_time());
        assert_eq!(
            gcs_uri("my-earth-ai-bucket", "gee_export", &name, "tif"),
            "gs://my-earth-ai-bucket/gee_export/S2_20250705_093041.tif"
        );
    }

    #[test]
    fn test_iso_timestamp_drops_offset() {
        assert_eq!(iso_timestamp(&sample_time()), "2025-07-05T09:30:41");
    }
}
