//! Command-line argument surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Batch-and-streaming video transcript ingestion engine")]
#[command(version)]
pub struct Cli {
    /// Path to an optional JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (stacks: -v, -vv).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion pipeline for a channel.
    Run {
        /// Channel handle, URL, or API id to ingest.
        #[arg(long)]
        channel: Option<String>,

        /// Override the configured database connection string.
        #[arg(long)]
        database_url: Option<String>,

        /// Re-ingest sources already marked done.
        #[arg(long)]
        force_reprocess: bool,

        /// Declare a local GPU is available for recognition routing.
        #[arg(long, env = "INGEST_LOCAL_GPU_AVAILABLE")]
        local_gpu: bool,

        /// Cap remote-API spend for this run, in dollars.
        #[arg(long)]
        max_cost_per_run: Option<f64>,
    },
    /// Load and validate configuration without running the pipeline.
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_with_channel_override() {
        let cli = Cli::parse_from(["ingest", "run", "--channel", "UCexample"]);
        match cli.command {
            Commands::Run { channel, .. } => assert_eq!(channel.as_deref(), Some("UCexample")),
            Commands::CheckConfig => panic!("expected Run"),
        }
    }

    #[test]
    fn check_config_parses() {
        let cli = Cli::parse_from(["ingest", "check-config"]);
        assert!(matches!(cli.command, Commands::CheckConfig));
    }
}
