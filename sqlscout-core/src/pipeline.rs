//! Survey pipeline.
//!
//! Fixed sequence: schema, foreign keys, row counts, distributions, merge.
//! Schema and foreign key failures abort the run; row count and
//! distribution failures are recorded per entity and the run continues.

use std::time::Instant;

use crate::adapters::{AnalysisConfig, CatalogSource};
use crate::analysis::analyze_distributions;
use crate::collection::{enrich_row_counts, fetch_foreign_keys, fetch_schema};
use crate::error::Result;
use crate::models::SchemaReport;
use crate::report::ReportBuilder;
use crate::session::ConnectionManager;

/// What a survey collects beyond schema and foreign keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyOptions {
    /// Histogram and cardinality settings for distribution analysis
    pub analysis: AnalysisConfig,
    /// Read partition-statistics row counts for every table
    pub collect_row_counts: bool,
    /// Build `fk_distributions`; when false the section is omitted
    pub analyze_distributions: bool,
    /// Free text copied into the report, masked before writing
    pub notes: Option<String>,
}

impl Default for SurveyOptions {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            collect_row_counts: true,
            analyze_distributions: true,
            notes: None,
        }
    }
}

/// Runs a survey against the manager's active session.
///
/// # Errors
/// Returns `ScoutError::NotConnected` when nothing is connected, otherwise
/// see [`survey_source`].
pub async fn run_survey(
    manager: &ConnectionManager,
    database_name: &str,
    options: &SurveyOptions,
) -> Result<SchemaReport> {
    let source = manager.active()?;
    survey_source(source.as_ref(), database_name, options).await
}

/// Runs a survey against any catalog source.
///
/// # Errors
/// Returns configuration errors for invalid options, query errors from the
/// schema or foreign key fetch, and any fatal error raised later.
pub async fn survey_source(
    source: &dyn CatalogSource,
    database_name: &str,
    options: &SurveyOptions,
) -> Result<SchemaReport> {
    options.analysis.validate()?;
    let started = Instant::now();
    tracing::info!("Surveying {} via {}", database_name, source.describe());

    let mut tables = fetch_schema(source).await?;
    tracing::info!(
        "Fetched {} tables ({} columns)",
        tables.len(),
        tables.iter().map(|t| t.columns.len()).sum::<usize>()
    );

    let foreign_keys = fetch_foreign_keys(source).await?;
    tracing::info!("Fetched {} foreign key column pairs", foreign_keys.len());

    let mut builder = ReportBuilder::new(database_name);
    let mut row_counts = Vec::new();

    if options.collect_row_counts {
        let outcome = enrich_row_counts(source, &mut tables).await?;
        tracing::info!(
            "Row counts collected for {} tables ({} failed)",
            outcome.counts.len(),
            outcome.warnings.len()
        );
        row_counts = outcome.counts.clone();
        builder = builder
            .row_counts(outcome.counts)
            .warnings(outcome.warnings);
    } else {
        tracing::info!("Row count collection skipped");
    }

    if options.analyze_distributions {
        let outcome =
            analyze_distributions(source, &foreign_keys, &options.analysis, &row_counts).await?;
        tracing::info!(
            "Analysed {} relationships ({} failed)",
            outcome.distributions.len(),
            outcome.warnings.len()
        );
        builder = builder
            .fk_distributions(outcome.distributions)
            .warnings(outcome.warnings);
    } else {
        tracing::info!("Distribution analysis skipped");
    }

    let report = builder
        .tables(tables)
        .foreign_keys(foreign_keys)
        .notes(options.notes.clone())
        .duration(started.elapsed())
        .build();

    tracing::info!(
        "Survey of {} finished in {:?}",
        database_name,
        started.elapsed()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::{ScriptedCatalog, SqlRow};
    use crate::error::ScoutError;

    fn column(schema: &str, table: &str, column: &str) -> SqlRow {
        SqlRow::new()
            .with("TABLE_SCHEMA", schema)
            .with("TABLE_NAME", table)
            .with("COLUMN_NAME", column)
            .with("DATA_TYPE", "int")
            .with("IS_NULLABLE", "NO")
    }

    #[tokio::test]
    async fn test_not_connected() {
        let manager = ConnectionManager::new();
        let err = run_survey(&manager, "db", &SurveyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::NotConnected));
    }

    #[tokio::test]
    async fn test_schema_failure_aborts() {
        let catalog = ScriptedCatalog::new("broken").fail_on("INFORMATION_SCHEMA.COLUMNS", "denied");
        let err = survey_source(&catalog, "db", &SurveyOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to fetch schema"));
    }

    #[tokio::test]
    async fn test_skipped_phases_issue_no_queries() {
        let catalog = ScriptedCatalog::new("fixture")
            .on("INFORMATION_SCHEMA.COLUMNS", vec![column("dbo", "Lonely", "Id")])
            .on("sys.foreign_keys", vec![]);
        let mut manager = ConnectionManager::new();
        let catalog = Arc::new(catalog);
        manager.attach(catalog.clone()).await.unwrap();

        let options = SurveyOptions {
            collect_row_counts: false,
            analyze_distributions: false,
            notes: Some("schema only".to_string()),
            ..SurveyOptions::default()
        };
        let report = run_survey(&manager, "Solo", &options).await.unwrap();

        assert_eq!(report.tables.len(), 1);
        assert!(report.row_counts.is_none());
        assert!(report.fk_distributions.is_none());
        assert_eq!(report.notes.as_deref(), Some("schema only"));
        assert_eq!(catalog.issued().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_querying() {
        let catalog = ScriptedCatalog::new("fixture");
        let options = SurveyOptions {
            analysis: AnalysisConfig::default().with_concurrency(0),
            ..SurveyOptions::default()
        };
        let err = survey_source(&catalog, "db", &options).await.unwrap_err();
        assert!(matches!(err, ScoutError::Configuration { .. }));
        assert!(catalog.issued().is_empty());
    }
}
