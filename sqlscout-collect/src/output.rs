//! Console summary printed after a survey.

use std::path::Path;

use sqlscout_core::SchemaReport;

/// Short summary of a written report for stdout.
pub fn render_summary(report: &SchemaReport, output: &Path) -> String {
    let distributions = report.fk_distributions.as_deref().unwrap_or_default();
    let analysed = distributions.iter().filter(|d| d.analysis.is_some()).count();
    let warnings = report
        .analysis_metadata
        .as_ref()
        .map_or(0, |m| m.warnings.len());

    let mut lines = vec![
        "Survey completed successfully".to_string(),
        format!("Output: {}", output.display()),
        format!("Database: {}", report.database_name),
        format!("Tables: {}", report.tables.len()),
        format!("Columns: {}", report.total_columns()),
        format!("Foreign keys: {}", report.foreign_keys.len()),
    ];
    if report.fk_distributions.is_some() {
        lines.push(format!(
            "Relationships analysed: {}/{}",
            analysed,
            distributions.len()
        ));
    }
    if warnings > 0 {
        lines.push(format!("Warnings: {} (see analysis_metadata.warnings)", warnings));
    }
    lines.join("\n")
}
