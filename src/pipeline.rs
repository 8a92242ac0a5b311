//! The data pull: query each catalog, submit exports, record metadata.
//!
//! Requests are issued one at a time. A catalog that matches nothing is
//! logged and skipped; any platform error aborts the pull as-is (no retries).

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::catalog::{CatalogImage, ImageQuery, select_images};
use crate::config_file::PullConfig;
use crate::earth_engine::{Operation, Platform};
use crate::error::{PullError, Result};
use crate::export::{ExportTask, ImageExportTask, TableExportTask};
use crate::metadata::{ImageMetadataRecord, MetadataTable};
use crate::types::Catalog;

/// Listing pages fetched per catalog before giving up on filling the limit
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Run-time switches that are not part of the saved configuration
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Query and write the local CSV, but submit nothing
    pub dry_run: bool,
    /// Poll submitted operations until they finish
    pub wait: bool,
    pub poll_interval: Duration,
    /// Give up waiting after this long; `None` waits indefinitely
    pub max_wait: Option<Duration>,
    pub max_pages: usize,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            wait: false,
            poll_interval: Duration::from_secs(30),
            max_wait: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// One export, submitted or planned
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub description: String,
    pub destination_uri: String,
    /// `None` in dry-run mode
    pub operation: Option<Operation>,
}

/// Per-catalog outcome
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSummary {
    pub catalog: Catalog,
    pub exports: Vec<ExportRecord>,
}

/// Outcome of a whole pull
#[derive(Debug, Clone, PartialEq)]
pub struct PullReport {
    pub catalogs: Vec<CatalogSummary>,
    pub metadata: MetadataTable,
    pub csv_path: PathBuf,
    pub table_export: Option<ExportRecord>,
    /// `(operation name, message)` of operations that failed while waiting
    pub failures: Vec<(String, String)>,
}

impl PullReport {
    /// Every export of the run, images first, then the table
    pub fn exports(&self) -> impl Iterator<Item = &ExportRecord> {
        self.catalogs
            .iter()
            .flat_map(|c| c.exports.iter())
            .chain(self.table_export.iter())
    }
}

/// Run the pull described by `config` against `platform`
pub async fn run_pull<P: Platform>(
    config: &PullConfig,
    platform: &P,
    options: &PullOptions,
) -> Result<PullReport> {
    config
        .validate()
        .map_err(|e| PullError::validation(format!("{:#}", e)))?;

    if options.dry_run {
        info!("Dry-run: exports will be planned but not submitted");
    }

    let mut summaries = Vec::with_capacity(config.catalogs.len());
    let mut metadata = MetadataTable::new();

    for &catalog in &config.catalogs {
        let query = ImageQuery::from_config(catalog, config);
        let images = query_catalog(platform, &query, options.max_pages).await?;
        if images.is_empty() {
            warn!(
                "{}: no images with {} in {}..{}",
                catalog,
                query.filter_expression(),
                query.start,
                query.end
            );
        } else {
            info!("{}: {} images selected", catalog, images.len());
        }

        let (summary, table) = export_catalog(platform, config, catalog, &images, options).await?;
        summaries.push(summary);
        metadata = metadata.merge(table);
    }

    let csv_path = metadata.save_csv(&config.output_dir, &config.metadata_name)?;
    info!("Metadata table ({} rows) written to {:?}", metadata.len(), csv_path);

    let table_export = if metadata.is_empty() {
        warn!("No scenes matched; skipping metadata table export");
        None
    } else {
        let task = TableExportTask::new(
            &metadata,
            &config.bucket,
            &config.folder,
            &config.metadata_name,
        );
        Some(submit_task(platform, &task, options.dry_run).await?)
    };

    let mut report = PullReport {
        catalogs: summaries,
        metadata,
        csv_path,
        table_export,
        failures: Vec::new(),
    };

    if options.wait && !options.dry_run {
        let names: Vec<String> = report
            .exports()
            .filter_map(|e| e.operation.as_ref().map(|op| op.name.clone()))
            .collect();
        report.failures =
            wait_for_operations(platform, &names, options.poll_interval, options.max_wait).await?;
    }

    Ok(report)
}

/// Page through the listing until `limit` images pass the local filter
pub async fn query_catalog<P: Platform>(
    platform: &P,
    query: &ImageQuery,
    max_pages: usize,
) -> Result<Vec<CatalogImage>> {
    let mut selected = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..max_pages.max(1) {
        let page = platform.list_images(query, page_token.as_deref()).await?;
        let remaining = ImageQuery {
            limit: query.limit - selected.len(),
            ..query.clone()
        };
        selected.extend(select_images(page.images, &remaining));

        match page.next_page_token {
            Some(token) if selected.len() < query.limit && !token.is_empty() => {
                page_token = Some(token)
            }
            _ => break,
        }
    }

    Ok(selected)
}

/// Build, submit and record the exports of one catalog
async fn export_catalog<P: Platform>(
    platform: &P,
    config: &PullConfig,
    catalog: Catalog,
    images: &[CatalogImage],
    options: &PullOptions,
) -> Result<(CatalogSummary, MetadataTable)> {
    let mut exports = Vec::with_capacity(images.len());
    let mut table = MetadataTable::new();

    for image in images {
        let task = ImageExportTask::new(
            image,
            catalog,
            &config.region,
            config.scale,
            &config.bucket,
            &config.folder,
        );
        // The row must exist before the export does
        let record =
            ImageMetadataRecord::from_image(image, catalog, &config.bucket, &config.folder)?;
        exports.push(submit_task(platform, &task, options.dry_run).await?);
        table.push(record);
    }

    Ok((CatalogSummary { catalog, exports }, table))
}

async fn submit_task<P: Platform, T: ExportTask>(
    platform: &P,
    task: &T,
    dry_run: bool,
) -> Result<ExportRecord> {
    let operation = if dry_run {
        info!("[dry-run] would export {} -> {}", task.description(), task.destination_uri());
        None
    } else {
        let op = platform.submit(task).await?;
        info!("Submitted {} as {}", task.description(), op.name);
        Some(op)
    };

    Ok(ExportRecord {
        description: task.description().to_string(),
        destination_uri: task.destination_uri(),
        operation,
    })
}

/// Poll each operation until it finishes; returns the failed ones.
///
/// With `max_wait`, operations still running at the deadline are reported
/// as failed and left running on the platform.
pub async fn wait_for_operations<P: Platform>(
    platform: &P,
    names: &[String],
    poll_interval: Duration,
    max_wait: Option<Duration>,
) -> Result<Vec<(String, String)>> {
    let started = Instant::now();
    let mut failures = Vec::new();

    for name in names {
        let op = loop {
            let op = platform.operation(name).await?;
            if op.is_finished() {
                break op;
            }
            let elapsed = started.elapsed();
            if max_wait.is_some_and(|limit| elapsed >= limit) {
                break op;
            }
            info!(
                "{} is {} ({:.0}%, {}s elapsed)",
                op.metadata.description,
                op.metadata.state,
                op.metadata.progress.unwrap_or(0.0) * 100.0,
                elapsed.as_secs()
            );
            tokio::time::sleep(poll_interval).await;
        };

        let failure = if op.is_finished() {
            op.failure()
        } else {
            Some(format!(
                "timed out after {}s while {}",
                started.elapsed().as_secs(),
                op.metadata.state
            ))
        };
        match failure {
            Some(message) => {
                warn!("{} failed: {}", name, message);
                failures.push((name.clone(), message));
            }
            None => info!("{} finished", name),
        }
    }

    Ok(failures)
}
