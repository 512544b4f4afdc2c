//! Foreign key listing from the `sys.foreign_keys` catalog views.

use crate::adapters::{CatalogSource, SqlRow};
use crate::error::Result;
use crate::models::{ColumnRef, ForeignKeyInfo};
use crate::queries;

const CONTEXT: &str = "foreign key";

/// Fetches every foreign key column pair.
///
/// Ordered by parent table, constraint name, then key column ordinal, so a
/// composite key yields consecutive entries in declared column order.
///
/// # Errors
/// Returns `ScoutError::Query` prefixed with "Failed to fetch foreign keys".
pub async fn fetch_foreign_keys(source: &dyn CatalogSource) -> Result<Vec<ForeignKeyInfo>> {
    tracing::debug!("Fetching foreign keys from {}", source.describe());
    let rows = source
        .query(queries::FOREIGN_KEYS, &[])
        .await
        .map_err(|e| e.context("Failed to fetch foreign keys"))?;

    let foreign_keys = rows.iter().map(to_foreign_key).collect::<Result<Vec<_>>>()?;
    tracing::debug!("Fetched {} foreign key column pairs", foreign_keys.len());
    Ok(foreign_keys)
}

fn to_foreign_key(row: &SqlRow) -> Result<ForeignKeyInfo> {
    Ok(ForeignKeyInfo::new(
        row.text("FK_Name", CONTEXT)?,
        ColumnRef::new(
            row.text("Parent_Schema", CONTEXT)?,
            row.text("Parent_Table", CONTEXT)?,
            row.text("Parent_Column", CONTEXT)?,
        ),
        ColumnRef::new(
            row.text("Referenced_Schema", CONTEXT)?,
            row.text("Referenced_Table", CONTEXT)?,
            row.text("Referenced_Column", CONTEXT)?,
        ),
    ))
}
