//! Catalog fetchers: schema, foreign keys and row counts.
//!
//! Each fetcher issues fixed read-only queries against a [`CatalogSource`]
//! and returns typed records. None of them retries.
//!
//! [`CatalogSource`]: crate::adapters::CatalogSource

mod foreign_keys;
mod row_counts;
mod schema;

pub use foreign_keys::fetch_foreign_keys;
pub use row_counts::{RowCountOutcome, enrich_row_counts, fetch_row_counts, fetch_table_row_count};
pub use schema::fetch_schema;
