//! refdelta CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "refdelta")]
#[command(about = "Structural diff and refactoring detection between two code snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file with matching and inference settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two snapshots and print the detected refactorings
    Diff {
        /// Before snapshot: a directory of *.cst.json files or a single file
        before: PathBuf,

        /// After snapshot
        after: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Diff every commit listed in a manifest
    Batch {
        /// JSON manifest of commits with before and after snapshots
        manifest: PathBuf,

        /// Print the full results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the tree built from a snapshot
    Inspect {
        snapshot: PathBuf,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("refdelta={}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Diff { before, after, json } => {
            commands::diff(cli.config.as_deref(), &before, &after, json)
        }
        Commands::Batch { manifest, json } => {
            commands::batch(cli.config.as_deref(), &manifest, json)
        }
        Commands::Inspect { snapshot } => {
            commands::inspect(&snapshot)
        }
        Commands::Version => {
            println!("refdelta v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
