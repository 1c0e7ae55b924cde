//! # Sluice CLI
//!
//! Command-line interface for the Sluice yield manager.
//!
//! This CLI provides commands for:
//! - Running allocation scenarios against simulated backends
//! - Validating manager and scenario configuration files

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;
mod scenario;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use commands::{simulate, validate};

/// Sluice - yield allocation manager
#[derive(Parser)]
#[command(name = "sluice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Prefix for environment variable overrides
    #[arg(long, global = true, default_value = "SLUICE")]
    env_prefix: String,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario against simulated backends
    Simulate(SimulateArgs),

    /// Validate a configuration file
    Validate(ValidateArgs),

    /// Show system information
    Info,
}

/// Arguments for simulate command
#[derive(Parser)]
pub struct SimulateArgs {
    /// Scenario file (yaml, json or toml)
    #[arg(short, long)]
    scenario: String,

    /// Output format (json, table)
    #[arg(short, long, default_value = "table")]
    output: String,

    /// Write emitted events as JSON lines to this file
    #[arg(long)]
    events_file: Option<String>,

    /// Stop at the first failing step
    #[arg(long)]
    fail_fast: bool,
}

/// Arguments for validate command
#[derive(Parser)]
pub struct ValidateArgs {
    /// Configuration file (yaml, json or toml)
    file: String,

    /// Treat the file as a full scenario instead of a manager config
    #[arg(long)]
    scenario: bool,

    /// List the environment variables that override the file
    #[arg(long)]
    show_env: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Simulate(args) => simulate::run(args, &cli.env_prefix)?,
        Commands::Validate(args) => validate::run(args, &cli.env_prefix)?,
        Commands::Info => print_info(),
    }

    Ok(())
}

fn print_info() {
    println!("Sluice Yield Manager");
    println!("====================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Rust Edition: 2024");
    println!();
    println!("Allocation:");
    println!("  - Yield-proportional target weights");
    println!("  - Concentration cap and participation floor");
    println!("  - Excess/deficit rebalance planning");
    println!();
    println!("Features:");
    println!("  - Weekly profit vs. execution cost gate");
    println!("  - Journaled fund movement with rollback");
    println!("  - Pool and admin capability tokens");
    println!("  - Scenario simulation");
}
