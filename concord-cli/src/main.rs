//! # concord CLI
//!
//! Drives the file-sharing application through scripted scenarios.

mod commands;
mod scenario;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "concord")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults apply when it does not exist)
    #[arg(long, default_value = "concord.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a scenario and print each request's responses
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Emit one JSON object per request instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the registered sync rules
    Syncs {
        /// Only print rule names
        #[arg(long)]
        names: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so scenario output stays machine-readable
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::WARN.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { scenario, json } => commands::run_scenario(&cli.config, &scenario, json).await,
        Commands::Syncs { names } => commands::list_syncs(&cli.config, names),
    }
}
