use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// scenepull - export cloud-free Sentinel-2 and Landsat 9 scenes from Earth Engine
#[derive(Parser)]
#[command(name = "scenepull")]
#[command(about = "Query Earth Engine catalogs, export matching scenes to Cloud Storage and record their metadata")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: query the catalogs and write the local metadata CSV,
    /// but submit no export tasks.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query the catalogs and submit the exports
    Run {
        /// Path to configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// OAuth2 access token, e.g. from `gcloud auth print-access-token`
        #[arg(long, env = "EE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// Override the Earth Engine project from the configuration
        #[arg(short, long)]
        project: Option<String>,

        /// Wait for every submitted export to finish
        #[arg(short, long)]
        wait: bool,

        /// Seconds between status checks while waiting
        #[arg(long, default_value_t = 30)]
        poll_interval: u64,

        /// Stop waiting after this many seconds; exports still running count as failed
        #[arg(long)]
        max_wait: Option<u64>,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// List supported catalogs
    Catalogs,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "scenepull",
            "--dry-run",
            "-vv",
            "run",
            "--config",
            "pull.json",
            "--access-token",
            "tok",
            "--wait",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run {
                config,
                access_token,
                wait,
                poll_interval,
                max_wait,
                project,
            } => {
                assert_eq!(config, Some(PathBuf::from("pull.json")));
                assert_eq!(access_token.as_deref(), Some("tok"));
                assert!(wait);
                assert_eq!(poll_interval, 30);
                assert!(max_wait.is_none());
                assert!(project.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_max_wait() {
        let cli =
            Cli::try_parse_from(["scenepull", "run", "--wait", "--max-wait", "3600"]).unwrap();
        match cli.command {
            Commands::Run { max_wait, .. } => assert_eq!(max_wait, Some(3600)),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["scenepull", "validate", "pull.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate { .. }));
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["scenepull"]).is_err());
    }
}
