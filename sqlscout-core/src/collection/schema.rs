//! Table and column listing from `INFORMATION_SCHEMA.COLUMNS`.

use std::collections::HashMap;

use crate::adapters::CatalogSource;
use crate::error::Result;
use crate::models::{ColumnInfo, TableInfo};
use crate::queries;

const CONTEXT: &str = "schema";

/// Fetches every table and view with its columns.
///
/// Tables appear in first-seen catalog order (schema, then name) and columns
/// keep their ordinal order.
///
/// # Errors
/// Returns `ScoutError::Query` prefixed with "Failed to fetch schema".
pub async fn fetch_schema(source: &dyn CatalogSource) -> Result<Vec<TableInfo>> {
    tracing::debug!("Fetching schema from {}", source.describe());
    let rows = source
        .query(queries::SCHEMA_COLUMNS, &[])
        .await
        .map_err(|e| e.context("Failed to fetch schema"))?;

    let mut tables: Vec<TableInfo> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in &rows {
        let table_name = format!(
            "{}.{}",
            row.text("TABLE_SCHEMA", CONTEXT)?,
            row.text("TABLE_NAME", CONTEXT)?
        );
        let column = ColumnInfo::new(
            row.text("COLUMN_NAME", CONTEXT)?,
            row.text("DATA_TYPE", CONTEXT)?,
            row.text("IS_NULLABLE", CONTEXT)?
                .trim()
                .eq_ignore_ascii_case("YES"),
        );

        let position = *index.entry(table_name.clone()).or_insert_with(|| {
            tables.push(TableInfo::new(table_name));
            tables.len() - 1
        });
        if let Some(table) = tables.get_mut(position) {
            table.columns.push(column);
        }
    }

    tracing::debug!(
        "Fetched {} tables with {} columns",
        tables.len(),
        rows.len()
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ScriptedCatalog, SqlRow};
    use crate::error::ScoutError;

    fn column_row(schema: &str, table: &str, column: &str, data_type: &str, nullable: &str) -> SqlRow {
        SqlRow::new()
            .with("TABLE_SCHEMA", schema)
            .with("TABLE_NAME", table)
            .with("COLUMN_NAME", column)
            .with("DATA_TYPE", data_type)
            .with("IS_NULLABLE", nullable)
    }

    #[tokio::test]
    async fn test_columns_keep_catalog_order() {
        let catalog = ScriptedCatalog::new("schema").on(
            "INFORMATION_SCHEMA.COLUMNS",
            vec![
                column_row("dbo", "Genres", "GenreID", "int", "NO"),
                column_row("dbo", "Genres", "Name", "nvarchar", "NO"),
                column_row("dbo", "Movies", "MovieID", "int", "NO"),
                column_row("dbo", "Movies", "Title", "nvarchar", "NO"),
                column_row("dbo", "Movies", "GenreID", "int", "yes"),
            ],
        );

        let tables = fetch_schema(&catalog).await.unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_name, "dbo.Genres");
        assert_eq!(tables[1].table_name, "dbo.Movies");

        let names: Vec<&str> = tables[1].columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(names, ["MovieID", "Title", "GenreID"]);
        assert!(!tables[1].columns[0].is_nullable);
        assert!(tables[1].columns[2].is_nullable);
    }

    #[tokio::test]
    async fn test_interleaved_rows_group_by_table() {
        let catalog = ScriptedCatalog::new("schema").on(
            "INFORMATION_SCHEMA.COLUMNS",
            vec![
                column_row("sales", "Orders", "OrderID", "int", "NO"),
                column_row("dbo", "Audit", "At", "datetime2", "NO"),
                column_row("sales", "Orders", "Total", "decimal", "YES"),
            ],
        );

        let tables = fetch_schema(&catalog).await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns.len(), 2);
        assert_eq!(tables[0].columns[1].column_name, "Total");
    }

    #[tokio::test]
    async fn test_empty_database() {
        let catalog = ScriptedCatalog::new("schema").on("INFORMATION_SCHEMA.COLUMNS", vec![]);
        assert!(fetch_schema(&catalog).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_query_error_with_context() {
        let catalog =
            ScriptedCatalog::new("schema").fail_on("INFORMATION_SCHEMA", "permission denied");

        let err = fetch_schema(&catalog).await.unwrap_err();
        assert!(matches!(err, ScoutError::Query { .. }));
        assert!(err.to_string().contains("Failed to fetch schema"));
    }
}
