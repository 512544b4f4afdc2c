//! SQL Server relationship survey collector.
//!
//! This binary connects to one SQL Server database, reads its catalog and
//! writes a YAML or JSON report of tables, foreign keys, row counts and
//! referenced-value distributions.
//!
//! # Security Guarantees
//! - Read-only catalog and aggregate queries only
//! - No credentials stored or logged
//! - Reports are validated before they are written

use std::process::ExitCode;

use sqlscout_collect::{Cli, Command, collect, output};
use sqlscout_core::{Result, init_logging, initialize_schema_validator};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before parsing so `.env` values back the env-aware flags
    let dotenv = dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    if let Some(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    initialize_schema_validator()?;

    match cli.command {
        Some(Command::Collect(args)) => run_collect(&args, cli.global.quiet).await,
        Some(Command::Test(args)) => {
            let version = collect::test_connection(&args).await?;
            println!("Connection successful");
            println!("{}", version.lines().next().unwrap_or_default());
            Ok(())
        }
        Some(Command::List) => {
            print!("{}", collect::supported_formats());
            Ok(())
        }
        None => run_collect(&cli.collect, cli.global.quiet).await,
    }
}

async fn run_collect(args: &sqlscout_collect::CollectArgs, quiet: bool) -> Result<()> {
    let report = collect::collect(args).await?;
    if !quiet {
        println!("{}", output::render_summary(&report, &args.output.output));
    }
    Ok(())
}
