//! Report assembly and file I/O.
//!
//! [`ReportBuilder`] merges the fetched pieces into a [`SchemaReport`];
//! [`write_report`] validates and writes it as YAML or JSON, and
//! [`read_report`] / [`decode_report`] load it back strictly.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ScoutError};
use crate::models::{
    AnalysisMetadata, FkDistribution, ForeignKeyInfo, SchemaReport, TableInfo, TableRowCount,
};
use crate::validation::{redact_credentials, validate_report_value};

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "schema_analysis.yaml";

/// Report file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Yaml,
    Json,
}

impl ReportFormat {
    /// Infers the format from a file extension (`.yaml`, `.yml`, `.json`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Uses `forced` when given, else the extension, else YAML.
    pub fn resolve(path: &Path, forced: Option<Self>) -> Self {
        forced
            .or_else(|| Self::from_path(path))
            .unwrap_or_default()
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ScoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ScoutError::configuration(format!(
                "Unknown report format '{}'; expected yaml or json",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Merges collection results into a report.
///
/// # Example
/// ```rust
/// use sqlscout_core::models::TableInfo;
/// use sqlscout_core::report::ReportBuilder;
///
/// let report = ReportBuilder::new("MovieReviews")
///     .tables(vec![TableInfo::new("dbo.Genres")])
///     .notes(Some("nightly run".to_string()))
///     .build();
///
/// assert_eq!(report.analysis_metadata.unwrap().total_tables, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    report: SchemaReport,
    duration: Duration,
    warnings: Vec<String>,
}

impl ReportBuilder {
    /// Starts a report for one database.
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            report: SchemaReport::new(database_name),
            duration: Duration::ZERO,
            warnings: Vec::new(),
        }
    }

    /// Sets the tables.
    pub fn tables(mut self, tables: Vec<TableInfo>) -> Self {
        self.report.tables = tables;
        self
    }

    /// Sets the foreign keys.
    pub fn foreign_keys(mut self, foreign_keys: Vec<ForeignKeyInfo>) -> Self {
        self.report.foreign_keys = foreign_keys;
        self
    }

    /// Sets the partition row counts.
    pub fn row_counts(mut self, row_counts: Vec<TableRowCount>) -> Self {
        self.report.row_counts = Some(row_counts);
        self
    }

    /// Sets the relationship distributions.
    pub fn fk_distributions(mut self, distributions: Vec<FkDistribution>) -> Self {
        self.report.fk_distributions = Some(distributions);
        self
    }

    /// Appends warnings for isolated failures.
    pub fn warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Sets the free-text notes.
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.report.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }

    /// Records how long the survey took.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Finishes the report, stamping the run metadata.
    pub fn build(self) -> SchemaReport {
        let mut report = self.report;
        report.analysis_metadata = Some(AnalysisMetadata {
            total_tables: report.tables.len(),
            analysis_timestamp: chrono::Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            warnings: self.warnings,
        });
        report
    }
}

/// Encodes a report as text.
///
/// # Errors
/// Returns `ScoutError::Serialization` if encoding fails.
pub fn encode_report(report: &SchemaReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Yaml => serde_yaml::to_string(report)
            .map_err(|e| ScoutError::serialization_failed("YAML encoding", e)),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| ScoutError::serialization_failed("JSON encoding", e)),
    }
}

/// Decodes a report from text.
///
/// Only structured input is accepted: anything that is not a report
/// mapping (plain prose, a list, unknown top-level keys, mistyped fields)
/// fails rather than being wrapped.
///
/// # Errors
/// Returns `ScoutError::MalformedInput` describing the first problem.
pub fn decode_report(text: &str, format: ReportFormat) -> Result<SchemaReport> {
    if text.trim().is_empty() {
        return Err(ScoutError::malformed_input("input is empty"));
    }

    match format {
        ReportFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|e| ScoutError::malformed_input(format!("invalid YAML report: {}", e))),
        ReportFormat::Json => serde_json::from_str(text)
            .map_err(|e| ScoutError::malformed_input(format!("invalid JSON report: {}", e))),
    }
}

/// Validates a report against the embedded JSON Schema and credential checks.
///
/// # Errors
/// Returns `ScoutError::Validation` on the first failing check.
pub fn validate_report(report: &SchemaReport) -> Result<()> {
    let value = serde_json::to_value(report)
        .map_err(|e| ScoutError::serialization_failed("JSON conversion for validation", e))?;
    validate_report_value(&value)?;
    Ok(())
}

/// Returns a copy of the report with inline passwords masked in notes,
/// warnings and per-entity error text.
///
/// Catalog names and key values are left untouched.
///
/// # Errors
/// Returns `ScoutError::Validation` if the credential patterns fail to compile.
pub fn redact_report(report: &SchemaReport) -> Result<SchemaReport> {
    let mut redacted = report.clone();

    if let Some(notes) = redacted.notes.as_mut() {
        *notes = redact_credentials(notes)?;
    }
    if let Some(metadata) = redacted.analysis_metadata.as_mut() {
        for warning in &mut metadata.warnings {
            *warning = redact_credentials(warning)?;
        }
    }
    for table in &mut redacted.tables {
        if let Some(error) = table.row_count_error.as_mut() {
            *error = redact_credentials(error)?;
        }
    }
    for dist in redacted.fk_distributions.iter_mut().flatten() {
        if let Some(error) = dist.error.as_mut() {
            *error = redact_credentials(error)?;
        }
    }

    if redacted != *report {
        tracing::warn!("Masked inline credentials in report notes or error text");
    }
    Ok(redacted)
}

/// Masks, validates and writes a report, creating parent directories as
/// needed.
///
/// # Errors
/// Returns a validation, serialization or I/O error; nothing is written
/// unless validation passes.
pub async fn write_report(report: &SchemaReport, path: &Path, format: ReportFormat) -> Result<()> {
    let report = redact_report(report)?;
    validate_report(&report)?;
    tracing::debug!("Report validation passed");

    let text = encode_report(&report, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ScoutError::io(format!("Failed to create directory {}", parent.display()), e)
        })?;
    }

    tokio::fs::write(path, text)
        .await
        .map_err(|e| ScoutError::io(format!("Failed to write to {}", path.display()), e))?;

    tracing::info!("Report written to {} ({})", path.display(), format);
    Ok(())
}

/// Reads and decodes a report file.
///
/// # Errors
/// Returns an I/O error if the file cannot be read, or
/// `ScoutError::MalformedInput` if it is not a report.
pub async fn read_report(path: &Path, format: Option<ReportFormat>) -> Result<SchemaReport> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ScoutError::io(format!("Failed to read {}", path.display()), e))?;
    decode_report(&text, ReportFormat::resolve(path, format))
}
