//! Cargador: command-line interface for Cargar load tests
//!
//! ## Usage
//!
//! ```bash
//! cargador run --base-url http://localhost:8000   # Default bookstore workload
//! cargador run --config load.yaml --json          # Custom profile, JSON summary
//! cargador validate --config load.yaml            # Check a config without running
//! ```

mod cli;
mod config;
mod error;
mod progress;

use cargar::{render_run_json, render_run_report, BookstoreScenario, Runner};
use clap::Parser;
use cli::{Cli, Commands, RunArgs, ValidateArgs};
use config::FileConfig;
use console::style;
use error::{CliError, CliResult};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(ref args) => run_load_test(args, cli.quiet).await,
        Commands::Validate(ref args) => validate_config(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_load_test(args: &RunArgs, quiet: bool) -> CliResult<()> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let mut run_config = file.into_run_config(args.base_url.clone())?;
    if args.seed.is_some() {
        run_config.seed = args.seed;
    }
    let total = run_config.profile.total_duration();
    tracing::info!(
        base_url = %run_config.base_url,
        stages = run_config.profile.stages().len(),
        total_secs = total.as_secs(),
        "configuration loaded"
    );

    let mut runner = Runner::new(run_config);
    let bar = if quiet || args.json {
        None
    } else {
        Some(progress::spawn_progress_bar(runner.progress(), total))
    };

    let summary = runner.run(Arc::new(BookstoreScenario)).await?;
    if let Some(bar) = bar {
        let _ = bar.await;
    }

    if args.json {
        println!("{}", render_run_json(&summary));
    } else {
        print!("{}", render_run_report(&summary));
    }
    if let Some(path) = &args.output {
        std::fs::write(path, render_run_json(&summary))?;
    }

    if summary.passed() {
        Ok(())
    } else {
        let failed = summary.thresholds.iter().filter(|v| !v.passed).count();
        Err(CliError::run_failed(format!(
            "{failed} threshold(s) failed"
        )))
    }
}

fn validate_config(args: &ValidateArgs) -> CliResult<()> {
    let config = FileConfig::load(&args.config)?.into_run_config(None)?;
    println!(
        "{} {} ({} stages, {}s total, {} thresholds)",
        style("✓").green(),
        args.config.display(),
        config.profile.stages().len(),
        config.profile.total_duration().as_secs(),
        config.thresholds.len()
    );
    Ok(())
}
