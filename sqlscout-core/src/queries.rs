//! Fixed catalog and aggregate queries.
//!
//! All statements are read-only. Catalog queries are constants; the
//! per-relationship aggregates are built from bracket-quoted identifiers
//! taken from `sys.*` catalog rows, never from user input.

use crate::models::ForeignKeyInfo;

/// Connectivity check
pub const PING: &str = "SELECT 1 AS Ok";

/// Server version string
pub const SERVER_VERSION: &str = "SELECT @@VERSION AS Version";

/// Every column of every table and view, in declared order
pub const SCHEMA_COLUMNS: &str = "\
SELECT TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, DATA_TYPE, IS_NULLABLE
FROM INFORMATION_SCHEMA.COLUMNS
ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION";

/// One row per foreign key column pair
pub const FOREIGN_KEYS: &str = "\
SELECT
    fk.name AS FK_Name,
    ps.name AS Parent_Schema,
    tp.name AS Parent_Table,
    cp.name AS Parent_Column,
    rs.name AS Referenced_Schema,
    tr.name AS Referenced_Table,
    cr.name AS Referenced_Column
FROM sys.foreign_keys fk
INNER JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
INNER JOIN sys.tables tp ON fkc.parent_object_id = tp.object_id
INNER JOIN sys.schemas ps ON tp.schema_id = ps.schema_id
INNER JOIN sys.columns cp ON fkc.parent_object_id = cp.object_id AND fkc.parent_column_id = cp.column_id
INNER JOIN sys.tables tr ON fkc.referenced_object_id = tr.object_id
INNER JOIN sys.schemas rs ON tr.schema_id = rs.schema_id
INNER JOIN sys.columns cr ON fkc.referenced_object_id = cr.object_id AND fkc.referenced_column_id = cr.column_id
ORDER BY ps.name, tp.name, fk.name, fkc.constraint_column_id";

/// Partition-statistics row counts for all user tables
pub const ROW_COUNTS: &str = "\
SELECT
    s.name AS SchemaName,
    t.name AS TableName,
    SUM(p.rows) AS RowCounts
FROM sys.tables t
INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
INNER JOIN sys.partitions p ON t.object_id = p.object_id
WHERE p.index_id IN (0, 1)
GROUP BY s.name, t.name
ORDER BY RowCounts DESC, s.name, t.name";

/// Partition-statistics row count for one table, bound as `@P1` schema, `@P2` table
pub const TABLE_ROW_COUNT: &str = "\
SELECT SUM(p.rows) AS RowCounts
FROM sys.tables t
INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
INNER JOIN sys.partitions p ON t.object_id = p.object_id
WHERE s.name = @P1 AND t.name = @P2 AND p.index_id IN (0, 1)";

/// Quotes an identifier with brackets, doubling any closing bracket.
///
/// ```rust
/// use sqlscout_core::queries::quote_ident;
///
/// assert_eq!(quote_ident("Movies"), "[Movies]");
/// assert_eq!(quote_ident("odd]name"), "[odd]]name]");
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Referenced-value histogram for one relationship.
///
/// Every referenced value appears once with the number of parent rows
/// pointing at it (zero included), busiest first. `top_n == 0` drops the
/// row limit.
pub fn fk_distribution(fk: &ForeignKeyInfo, top_n: u32) -> String {
    let ref_col = quote_ident(&fk.referenced.column);
    let parent_col = quote_ident(&fk.parent.column);

    let mut sql = format!(
        "SELECT ref.{ref_col} AS RefValue, COUNT(parent.{parent_col}) AS RefCount\n\
         FROM {ref_schema}.{ref_table} AS ref\n\
         LEFT JOIN {parent_schema}.{parent_table} AS parent ON ref.{ref_col} = parent.{parent_col}\n\
         GROUP BY ref.{ref_col}\n\
         ORDER BY RefCount DESC",
        ref_schema = quote_ident(&fk.referenced.schema),
        ref_table = quote_ident(&fk.referenced.table),
        parent_schema = quote_ident(&fk.parent.schema),
        parent_table = quote_ident(&fk.parent.table),
    );

    if top_n > 0 {
        sql.push_str(&format!("\nOFFSET 0 ROWS FETCH NEXT {} ROWS ONLY", top_n));
    }

    sql
}

/// Distinct-value statistics for one relationship.
///
/// Columns: `ParentNonNull`, `ParentDistinct`, `ReferencedDistinct`.
pub fn fk_distinct_stats(fk: &ForeignKeyInfo) -> String {
    let parent_col = quote_ident(&fk.parent.column);
    let ref_col = quote_ident(&fk.referenced.column);

    format!(
        "SELECT\n\
         \x20   (SELECT COUNT_BIG(parent.{parent_col}) FROM {parent_schema}.{parent_table} AS parent) AS ParentNonNull,\n\
         \x20   (SELECT COUNT_BIG(DISTINCT parent.{parent_col}) FROM {parent_schema}.{parent_table} AS parent) AS ParentDistinct,\n\
         \x20   (SELECT COUNT_BIG(DISTINCT ref.{ref_col}) FROM {ref_schema}.{ref_table} AS ref) AS ReferencedDistinct",
        parent_schema = quote_ident(&fk.parent.schema),
        parent_table = quote_ident(&fk.parent.table),
        ref_schema = quote_ident(&fk.referenced.schema),
        ref_table = quote_ident(&fk.referenced.table),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnRef;

    fn fk() -> ForeignKeyInfo {
        ForeignKeyInfo::new(
            "FK_Movies_Genres",
            ColumnRef::new("dbo", "Movies", "GenreID"),
            ColumnRef::new("dbo", "Genres", "GenreID"),
        )
    }

    #[test]
    fn test_distribution_query_shape() {
        let sql = fk_distribution(&fk(), 5);
        assert!(sql.starts_with("SELECT ref.[GenreID] AS RefValue, COUNT(parent.[GenreID]) AS RefCount"));
        assert!(sql.contains("FROM [dbo].[Genres] AS ref"));
        assert!(sql.contains("LEFT JOIN [dbo].[Movies] AS parent ON ref.[GenreID] = parent.[GenreID]"));
        assert!(sql.contains("ORDER BY RefCount DESC"));
        assert!(sql.ends_with("OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"));
    }

    #[test]
    fn test_unbounded_distribution_query() {
        let sql = fk_distribution(&fk(), 0);
        assert!(!sql.contains("FETCH NEXT"));
        assert!(sql.ends_with("ORDER BY RefCount DESC"));
    }

    #[test]
    fn test_hostile_identifiers_are_quoted() {
        let fk = ForeignKeyInfo::new(
            "FK_x",
            ColumnRef::new("dbo", "Evil]; DROP TABLE x; --", "id"),
            ColumnRef::new("dbo", "T", "id"),
        );
        let sql = fk_distribution(&fk, 10);
        assert!(sql.contains("[dbo].[Evil]]; DROP TABLE x; --]"));
    }

    #[test]
    fn test_distinct_stats_query() {
        let sql = fk_distinct_stats(&fk());
        assert!(sql.contains("COUNT_BIG(parent.[GenreID]) FROM [dbo].[Movies] AS parent) AS ParentNonNull"));
        assert!(sql.contains("COUNT_BIG(DISTINCT parent.[GenreID])"));
        assert!(sql.contains("COUNT_BIG(DISTINCT ref.[GenreID]) FROM [dbo].[Genres] AS ref) AS ReferencedDistinct"));
    }

    #[test]
    fn test_foreign_keys_ordered_by_parent_schema_first() {
        assert!(FOREIGN_KEYS.ends_with("ORDER BY ps.name, tp.name, fk.name, fkc.constraint_column_id"));
    }

    #[test]
    fn test_catalog_queries_are_read_only() {
        for sql in [SCHEMA_COLUMNS, FOREIGN_KEYS, ROW_COUNTS, TABLE_ROW_COUNT] {
            assert!(sql.trim_start().starts_with("SELECT"));
            assert!(!sql.contains("COUNT(*)"));
        }
        assert!(TABLE_ROW_COUNT.contains("@P1") && TABLE_ROW_COUNT.contains("@P2"));
    }
}
