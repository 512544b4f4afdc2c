//! SQLScout report processor.
//!
//! Works on report files only: strict re-encoding between YAML and JSON,
//! and a console summary of relationship health.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sqlscout::{Cli, Commands, process, summarize};
use sqlscout_core::{init_logging, initialize_schema_validator};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    initialize_schema_validator()?;

    match cli.command {
        Some(Commands::Process {
            input,
            format,
            output,
        }) => {
            let encoded = process(&input, format, output.as_deref())
                .await
                .with_context(|| format!("Failed to process {}", input.display()))?;
            if let Some(text) = encoded {
                print!("{}", text);
            }
        }
        Some(Commands::Summary { input }) => {
            let summary = summarize(&input)
                .await
                .with_context(|| format!("Failed to summarise {}", input.display()))?;
            print!("{}", summary);
        }
        None => {
            println!("sqlscout v{}", env!("CARGO_PKG_VERSION"));
            println!("SQLScout report processor");
            println!("Use --help for available commands");
        }
    }
    Ok(())
}
