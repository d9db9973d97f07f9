//! Flowcheck CLI - Main Entry Point
//!
//! Runs the static contract check or the runtime check against the
//! pinned flows of a repository. Exits 0 when everything passes and 1 on
//! any recorded failure or fatal condition.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{contract, runtime, Session};

/// Flowcheck - flow contract checks for HTTP services
#[derive(Parser)]
#[command(name = "flowcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Repository root holding spec/ and api/
    #[arg(long, env = "FLOWCHECK_ROOT", default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to <root>/flowcheck.toml when present)
    #[arg(long, env = "FLOWCHECK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Summary format printed after the run
    #[arg(long, default_value = "plain", global = true)]
    format: output::OutputFormat,

    /// Also write the result as JSON to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute flows against a live service and enforce SLOs
    Runtime(runtime::RuntimeArgs),

    /// Check flows against the OpenAPI document without sending requests
    Contract,

    /// Show version information
    Version,
}

fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("FAIL: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let result = match cli.command {
        Commands::Version => {
            println!("flowcheck v{}", flowcheck_core::VERSION);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Contract => {
            let session = Session::load(&cli.root, cli.config.as_deref())?;
            contract::execute(&session)?
        }
        Commands::Runtime(args) => {
            let session = Session::load(&cli.root, cli.config.as_deref())?;
            runtime::execute(args, &session).await?
        }
    };

    result.log_summary();
    output::print_result(&result, cli.format);
    if let Some(path) = &cli.report {
        result.write_json(path)?;
    }

    Ok(if result.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
