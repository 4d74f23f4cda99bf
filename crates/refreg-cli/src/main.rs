//! Command-line interface for the reference-metadata registry

use anyhow::Result;
use clap::{Parser, Subcommand};
use refreg_cli::{check_config, run_scenario, RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "refreg")]
#[command(about = "Permissioned reference-metadata registry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a TOML scenario and print committed events as JSON lines
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Registry configuration (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Start from a saved registry snapshot
        #[arg(long)]
        state: Option<PathBuf>,

        /// Save the final registry snapshot
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file (TOML or JSON)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            config,
            state,
            save,
        } => {
            let summary = run_scenario(&RunOptions {
                scenario,
                config,
                state,
                save,
            })
            .await?;
            for line in &summary.event_lines {
                println!("{line}");
            }
            tracing::info!(
                steps = summary.steps.len(),
                events = summary.event_lines.len(),
                records = summary.snapshot.records.len(),
                "scenario passed"
            );
        }

        Commands::CheckConfig { file } => {
            let config = check_config(&file)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
