//! Report post-processing for SQLScout survey files.
//!
//! Reads a report written by `sqlscout-collect`, re-encodes it between YAML
//! and JSON, or prints a relationship health summary. No database access.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use sqlscout_core::report::{redact_report, validate_report};
use sqlscout_core::{
    FkDistribution, LogFormat, ReportFormat, Result, SchemaReport, encode_report, read_report,
    write_report,
};
use tracing::info;

/// Command-line interface for the report processor
#[derive(Parser, Debug)]
#[command(name = "sqlscout")]
#[command(about = "SQLScout report processor and summariser")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags shared by every subcommand
#[derive(clap::Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text", value_name = "FORMAT")]
    pub log_format: LogFormat,
}

/// Available commands for the processor
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a report strictly and write it back out
    Process {
        /// Input report path (.yaml, .yml or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format, inferred from the output path when omitted
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file path, stdout when omitted
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Print tables, foreign keys and relationship health
    Summary {
        /// Input report path (.yaml, .yml or .json)
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// Available output formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML document
    Yaml,
    /// Pretty-printed JSON
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => ReportFormat::Yaml,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

/// Re-encodes a report. Returns the encoded text when no output path is
/// given, `None` once the file is written.
///
/// # Errors
/// Fails if the input is not a well-formed report, or if the re-encoded
/// report fails validation or cannot be written.
pub async fn process(
    input: &Path,
    format: Option<OutputFormat>,
    output: Option<&Path>,
) -> Result<Option<String>> {
    let report = read_report(input, None).await?;
    info!(
        "Loaded report for {} ({} tables)",
        report.database_name,
        report.tables.len()
    );

    let forced = format.map(ReportFormat::from);
    match output {
        Some(path) => {
            let format = ReportFormat::resolve(path, forced);
            write_report(&report, path, format).await?;
            info!("Wrote {} ({})", path.display(), format);
            Ok(None)
        }
        None => {
            let report = redact_report(&report)?;
            validate_report(&report)?;
            Ok(Some(encode_report(&report, forced.unwrap_or_default())?))
        }
    }
}

/// Loads a report and renders its summary.
///
/// # Errors
/// Fails if the input is not a well-formed report.
pub async fn summarize(input: &Path) -> Result<String> {
    let report = read_report(input, None).await?;
    Ok(render_summary(&report))
}

/// Human-readable summary of a report.
pub fn render_summary(report: &SchemaReport) -> String {
    let mut out = String::new();
    let dangling = report.dangling_foreign_keys();

    let _ = writeln!(out, "Database: {}", report.database_name);
    let _ = writeln!(
        out,
        "Tables: {} ({} columns)",
        report.tables.len(),
        report.total_columns()
    );
    let _ = writeln!(out, "Foreign keys: {}", report.foreign_keys.len());
    if !dangling.is_empty() {
        let _ = writeln!(out, "Dangling foreign keys: {}", dangling.len());
        for fk in dangling {
            let _ = writeln!(out, "  {} ({})", fk.relationship_key(), fk.constraint_name);
        }
    }

    if let Some(metadata) = &report.analysis_metadata {
        let _ = writeln!(
            out,
            "Surveyed: {} by sqlscout {} in {} ms",
            metadata.analysis_timestamp.to_rfc3339(),
            metadata.tool_version,
            metadata.duration_ms
        );
    }

    match &report.fk_distributions {
        Some(distributions) if !distributions.is_empty() => {
            let _ = writeln!(out, "Relationships:");
            for dist in distributions {
                let _ = writeln!(out, "  {}", relationship_line(dist));
            }
        }
        Some(_) => {
            let _ = writeln!(out, "Relationships: none");
        }
        None => {
            let _ = writeln!(out, "Relationships: not analysed");
        }
    }

    if let Some(metadata) = &report.analysis_metadata
        && !metadata.warnings.is_empty()
    {
        let _ = writeln!(out, "Warnings:");
        for warning in &metadata.warnings {
            let _ = writeln!(out, "  {}", warning);
        }
    }
    if let Some(notes) = &report.notes {
        let _ = writeln!(out, "Notes: {}", notes);
    }
    out
}

fn relationship_line(dist: &FkDistribution) -> String {
    let column = format!(
        "{} [{}.{} -> {}]",
        dist.relationship, dist.constraint_name, dist.parent.column, dist.referenced.column
    );
    if let Some(error) = &dist.error {
        return format!("{}  error: {}", column, error);
    }
    match &dist.analysis {
        Some(analysis) => format!(
            "{}  {}  ratio {:.2}  {}  {}  ({} values, {} unused)",
            column,
            analysis.cardinality,
            analysis.distribution_ratio,
            analysis.pattern,
            analysis.health,
            dist.top.len(),
            dist.zero_count_values()
        ),
        None => format!("{}  not analysed", column),
    }
}
