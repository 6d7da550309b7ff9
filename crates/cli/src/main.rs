//! RecallKit CLI — the main entry point.
//!
//! Commands:
//! - `pack`       — Pack memories into a phase-budgeted context block
//! - `calibrate`  — Compute the calibration factor and step budget
//! - `phases`     — Show the packing table for every phase
//! - `config`     — Show, locate or validate configuration
//! - `memory`     — Inspect the configured memory store

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "recallkit",
    about = "RecallKit — memory retrieval shaping for coding agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack memories into a context block for a phase
    Pack {
        /// Phase to pack for (define, implement, validate, refine, explore, reflect)
        #[arg(short, long)]
        phase: String,

        /// JSON file holding a ranked array of memories. Reads the configured
        /// store, highest confidence first, when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Project filter when reading from the store
        #[arg(long, env = "RECALLKIT_PROJECT")]
        project: Option<String>,

        /// Print the packing report after the context block
        #[arg(long)]
        report: bool,
    },

    /// Compute the calibration factor and adjusted step budget
    Calibrate {
        /// Comma-separated module names
        #[arg(short, long, value_delimiter = ',', required = true)]
        modules: Vec<String>,

        /// Project id (defaults to config `project_id`)
        #[arg(long, env = "RECALLKIT_PROJECT")]
        project: Option<String>,

        /// Base step budget (defaults to config `calibration.default_base_steps`)
        #[arg(short, long)]
        base_steps: Option<u32>,
    },

    /// Show the packing budget and allocation for every phase
    Phases,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Memory store inspection
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Validate the configuration file
    Validate,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show memory counts by type
    Stats,
    /// List stored memories
    List {
        /// Only this memory type
        #[arg(short = 't', long = "type")]
        memory_type: Option<String>,

        /// Maximum number of memories to list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Pack {
            phase,
            input,
            project,
            report,
        } => commands::pack::run(&phase, input, project, report).await?,
        Commands::Calibrate {
            modules,
            project,
            base_steps,
        } => commands::calibrate::run(modules, project, base_steps).await?,
        Commands::Phases => commands::phases::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Memory { action } => match action {
            MemoryAction::Stats => commands::memory::stats().await?,
            MemoryAction::List { memory_type, limit } => {
                commands::memory::list(memory_type, limit).await?
            }
        },
    }

    Ok(())
}
