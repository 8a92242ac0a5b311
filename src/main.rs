//! scenepull - Main entry point
//!
//! Parses the command line, sets up logging and dispatches to the library.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use scenepull::cli::{Cli, Commands};
use scenepull::{Catalog, EarthEngineClient, PullConfig, PullError, PullOptions, run_pull};

/// Initialize the tracing subscriber; RUST_LOG overrides the -v level
fn init_logger(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { config } => {
            info!("Validating configuration file: {:?}", config);
            let config = PullConfig::load_from_file(&config)?;
            config.validate()?;
            println!("✓ Configuration file is valid");
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            PullConfig::default().save_to_file(&path)?;
            println!("✓ Default configuration written to {}", path.display());
        }
        Commands::Catalogs => print_catalogs(),
        Commands::Run {
            config,
            access_token,
            project,
            wait,
            poll_interval,
            max_wait,
        } => {
            let options = PullOptions {
                dry_run: cli.dry_run,
                wait,
                poll_interval: Duration::from_secs(poll_interval.max(1)),
                max_wait: max_wait.map(Duration::from_secs),
                ..Default::default()
            };
            run(config.as_deref(), access_token, project, &options).await?;
        }
    }

    Ok(())
}

async fn run(
    config_path: Option<&Path>,
    access_token: Option<String>,
    project: Option<String>,
    options: &PullOptions,
) -> Result<()> {
    let mut config = PullConfig::load_or_default(config_path)?;
    if let Some(project) = project {
        config.project = project;
    }
    config.validate()?;
    info!(
        "Pulling {:?} for {}..{} into gs://{}/{}",
        config.catalogs, config.start_date, config.end_date, config.bucket, config.folder
    );

    let client = EarthEngineClient::new(&config.project, access_token.unwrap_or_default())
        .context("Set EE_ACCESS_TOKEN or pass --access-token")?;

    let report = run_pull(&config, &client, options).await?;

    for summary in &report.catalogs {
        println!("{}: {} scene(s)", summary.catalog, summary.exports.len());
    }
    for export in report.exports() {
        match &export.operation {
            Some(op) => println!("  {} -> {} [{}]", export.description, export.destination_uri, op.name),
            None => println!("  {} -> {} [planned]", export.description, export.destination_uri),
        }
    }
    println!("✓ Metadata ({} rows) written to {}", report.metadata.len(), report.csv_path.display());

    if let Some((name, message)) = report.failures.first() {
        for (name, message) in &report.failures {
            error!("Export {} failed: {}", name, message);
        }
        return Err(PullError::Operation {
            name: name.clone(),
            message: format!("{} ({} export(s) failed)", message, report.failures.len()),
        }
        .into());
    }

    Ok(())
}

fn print_catalogs() {
    for catalog in Catalog::iter() {
        println!("{} {}", catalog, catalog.title());
        println!("   asset: {}", catalog.asset_id());
        println!("   bands: {}", catalog.bands().join(","));
        println!("   cloud: {}", catalog.cloud_property());
    }
}
