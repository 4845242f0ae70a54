//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Staged-ramp HTTP load testing
#[derive(Debug, Parser)]
#[command(name = "cargador", version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a load test and report the verdict
    Run(RunArgs),
    /// Validate a config file without running anything
    Validate(ValidateArgs),
}

/// Arguments for `cargador run`
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to a YAML run configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the target service (overrides the config file)
    #[arg(short, long, env = "CARGAR_BASE_URL")]
    pub base_url: Option<String>,

    /// Print the summary as JSON instead of the text report
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON summary to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed for deterministic scenario randomness (overrides the config file)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `cargador validate`
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to the YAML run configuration to validate
    #[arg(short, long)]
    pub config: PathBuf,
}
