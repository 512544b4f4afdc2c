//! Row counts from partition statistics.
//!
//! Counts come from `sys.partitions` (heap or clustered index only), never
//! from `COUNT(*)`, so they are cheap and approximately current.

use std::collections::HashMap;

use crate::adapters::CatalogSource;
use crate::error::Result;
use crate::models::{TableInfo, TableRowCount};
use crate::queries;

const CONTEXT: &str = "row count";

/// Result of merging row counts into the table list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCountOutcome {
    /// Counts in report order: largest first, then by name
    pub counts: Vec<TableRowCount>,
    /// One message per table whose count could not be read
    pub warnings: Vec<String>,
}

/// Fetches row counts for every user table in one query.
///
/// # Errors
/// Returns `ScoutError::Query` prefixed with "Failed to fetch row counts".
pub async fn fetch_row_counts(source: &dyn CatalogSource) -> Result<Vec<TableRowCount>> {
    let rows = source
        .query(queries::ROW_COUNTS, &[])
        .await
        .map_err(|e| e.context("Failed to fetch row counts"))?;

    rows.iter()
        .map(|row| {
            Ok(TableRowCount {
                table: format!(
                    "{}.{}",
                    row.text("SchemaName", CONTEXT)?,
                    row.text("TableName", CONTEXT)?
                ),
                rows: row.count("RowCounts", CONTEXT)?,
            })
        })
        .collect()
}

/// Fetches the row count of one table.
///
/// Returns `None` when the object has no partition statistics (views).
///
/// # Errors
/// Returns `ScoutError::Query` naming the table.
pub async fn fetch_table_row_count(
    source: &dyn CatalogSource,
    schema: &str,
    table: &str,
) -> Result<Option<u64>> {
    let rows = source
        .query(queries::TABLE_ROW_COUNT, &[schema, table])
        .await
        .map_err(|e| e.context(&format!("Failed to count rows of {}.{}", schema, table)))?;

    match rows.first() {
        Some(row) => Ok(row
            .opt_int("RowCounts", CONTEXT)?
            .map(|n| u64::try_from(n).unwrap_or(0))),
        None => Ok(None),
    }
}

/// Merges partition row counts into `tables`.
///
/// The bulk query is tried first. If it fails, each table is counted on its
/// own; a table whose query fails gets `row_count_error` and the rest carry
/// on. Tables without partition statistics keep `row_count = None`.
///
/// # Errors
/// Only fatal errors (lost connection, configuration) are returned.
pub async fn enrich_row_counts(
    source: &dyn CatalogSource,
    tables: &mut [TableInfo],
) -> Result<RowCountOutcome> {
    match fetch_row_counts(source).await {
        Ok(counts) => {
            let by_table: HashMap<&str, u64> =
                counts.iter().map(|c| (c.table.as_str(), c.rows)).collect();
            for table in tables.iter_mut() {
                table.row_count = by_table.get(table.table_name.as_str()).copied();
                table.row_count_error = None;
            }
            tracing::debug!("Row counts fetched for {} tables", counts.len());
            Ok(RowCountOutcome {
                counts,
                warnings: Vec::new(),
            })
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!("Bulk row count query failed, counting per table: {}", e);
            enrich_per_table(source, tables).await
        }
    }
}

async fn enrich_per_table(
    source: &dyn CatalogSource,
    tables: &mut [TableInfo],
) -> Result<RowCountOutcome> {
    let mut outcome = RowCountOutcome::default();

    for table in tables.iter_mut() {
        let (schema, name) = table.schema_and_name();
        let (schema, name) = (schema.to_string(), name.to_string());

        match fetch_table_row_count(source, &schema, &name).await {
            Ok(count) => {
                table.row_count = count;
                table.row_count_error = None;
                if let Some(rows) = count {
                    outcome.counts.push(TableRowCount {
                        table: table.table_name.clone(),
                        rows,
                    });
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Row count unavailable for {}: {}", table.table_name, e);
                table.row_count = None;
                table.row_count_error = Some(e.to_string());
                outcome
                    .warnings
                    .push(format!("row count for {}: {}", table.table_name, e));
            }
        }
    }

    outcome
        .counts
        .sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.table.cmp(&b.table)));
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ScriptedCatalog, SqlRow};
    use crate::error::ScoutError;

    fn count_row(schema: &str, table: &str, rows: i64) -> SqlRow {
        SqlRow::new()
            .with("SchemaName", schema)
            .with("TableName", table)
            .with("RowCounts", rows)
    }

    fn tables() -> Vec<TableInfo> {
        vec![
            TableInfo::new("dbo.Genres"),
            TableInfo::new("dbo.Movies"),
            TableInfo::new("dbo.vw_MovieTitles"),
        ]
    }

    #[tokio::test]
    async fn test_bulk_counts_use_partition_statistics_only() {
        let catalog = ScriptedCatalog::new("rc").on(
            "GROUP BY s.name, t.name",
            vec![count_row("dbo", "Movies", 4), count_row("dbo", "Genres", 3)],
        );

        let counts = fetch_row_counts(&catalog).await.unwrap();
        assert_eq!(counts[0], TableRowCount { table: "dbo.Movies".into(), rows: 4 });

        for issued in catalog.issued() {
            assert!(issued.sql.contains("sys.partitions"));
            assert!(issued.sql.contains("index_id IN (0, 1)"));
            assert!(!issued.sql.to_uppercase().contains("COUNT(*)"));
        }
    }

    #[tokio::test]
    async fn test_enrich_from_bulk_query() {
        let catalog = ScriptedCatalog::new("rc").on(
            "GROUP BY s.name, t.name",
            vec![count_row("dbo", "Movies", 4), count_row("dbo", "Genres", 3)],
        );
        let mut tables = tables();

        let outcome = enrich_row_counts(&catalog, &mut tables).await.unwrap();

        assert_eq!(outcome.counts.len(), 2);
        assert!(outcome.warnings.is_empty());
        assert_eq!(tables[0].row_count, Some(3));
        assert_eq!(tables[1].row_count, Some(4));
        // Views have no partitions
        assert_eq!(tables[2].row_count, None);
        assert_eq!(tables[2].row_count_error, None);
    }

    #[tokio::test]
    async fn test_fallback_isolates_failing_table() {
        let catalog = ScriptedCatalog::new("rc")
            .fail_on("GROUP BY s.name, t.name", "timeout")
            .on_params("@P1", &["dbo", "Genres"], vec![SqlRow::new().with("RowCounts", 3_i64)])
            .fail_on_params("@P1", &["dbo", "Movies"], "permission denied")
            .on_params(
                "@P1",
                &["dbo", "vw_MovieTitles"],
                vec![SqlRow::new().with("RowCounts", Option::<i64>::None)],
            );
        let mut tables = tables();

        let outcome = enrich_row_counts(&catalog, &mut tables).await.unwrap();

        assert_eq!(tables[0].row_count, Some(3));
        assert_eq!(tables[1].row_count, None);
        assert!(tables[1].row_count_error.as_deref().unwrap().contains("dbo.Movies"));
        assert_eq!(tables[2].row_count, None);
        assert_eq!(tables[2].row_count_error, None);

        assert_eq!(outcome.counts, vec![TableRowCount { table: "dbo.Genres".into(), rows: 3 }]);
        assert_eq!(outcome.warnings.len(), 1);

        let per_table: Vec<_> = catalog
            .issued()
            .into_iter()
            .filter(|q| q.sql.contains("@P1"))
            .map(|q| q.params)
            .collect();
        assert_eq!(per_table.len(), 3);
        assert_eq!(per_table[1], vec!["dbo".to_string(), "Movies".to_string()]);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts() {
        let catalog = ScriptedCatalog::new("rc");
        catalog.close().await.unwrap();
        let mut tables = tables();

        let err = enrich_row_counts(&catalog, &mut tables).await.unwrap_err();
        assert!(matches!(err, ScoutError::NotConnected));
    }
}
