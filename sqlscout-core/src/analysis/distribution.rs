//! Per-relationship reference-value histograms.
//!
//! For each foreign key the referenced table's key values are left-joined
//! against the parent table and counted, busiest first, limited to the
//! configured top N. Relationships are analysed with bounded concurrency;
//! output order always follows the foreign key order.

use std::collections::HashMap;

use futures::{StreamExt, TryStreamExt, stream};

use super::classify::{
    assess_health, classify_cardinality, classify_distinct, classify_pattern, distribution_ratio,
    performance_indicator,
};
use crate::adapters::{AnalysisConfig, CardinalityMode, CatalogSource};
use crate::collection::fetch_table_row_count;
use crate::error::Result;
use crate::models::{
    CardinalityBasis, ColumnRef, DistinctStats, FkDistribution, FkDistributionEntry,
    ForeignKeyInfo, RelationshipAnalysis, TableRowCount,
};
use crate::queries;

const CONTEXT: &str = "distribution";

/// Analysed relationships plus the failures that were isolated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionOutcome {
    /// One entry per foreign key column pair, in input order
    pub distributions: Vec<FkDistribution>,
    /// One message per relationship that failed or was left unclassified
    pub warnings: Vec<String>,
}

/// Fetches the top-N referenced values and their parent row counts.
///
/// With `include_zeroes == false`, values no parent row points at are
/// removed after the fetch, so fewer than N entries may come back.
///
/// # Errors
/// Returns `ScoutError::Query` naming the relationship.
pub async fn fetch_distribution(
    source: &dyn CatalogSource,
    fk: &ForeignKeyInfo,
    config: &AnalysisConfig,
) -> Result<Vec<FkDistributionEntry>> {
    let sql = queries::fk_distribution(fk, config.top_n);
    tracing::debug!("Distribution query for {}", fk.constraint_name);

    let rows = source
        .query(&sql, &[])
        .await
        .map_err(|e| e.context(&format!("Distribution of {}", fk.constraint_name)))?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let count = row.count("RefCount", CONTEXT)?;
        let value = row.take("RefValue", CONTEXT)?;
        entries.push(FkDistributionEntry::new(value.into(), count));
    }

    if !config.include_zeroes {
        entries.retain(|e| e.count > 0);
    }
    if config.top_n > 0 {
        entries.truncate(config.top_n as usize);
    }

    Ok(entries)
}

/// Fetches distinct-value statistics for one relationship.
///
/// # Errors
/// Returns `ScoutError::Query` naming the relationship.
pub async fn fetch_distinct_stats(
    source: &dyn CatalogSource,
    fk: &ForeignKeyInfo,
) -> Result<DistinctStats> {
    let rows = source
        .query(&queries::fk_distinct_stats(fk), &[])
        .await
        .map_err(|e| e.context(&format!("Distinct statistics of {}", fk.constraint_name)))?;

    let row = rows.first().ok_or_else(|| {
        crate::error::ScoutError::parse_field("ParentNonNull", "distinct statistics")
    })?;

    Ok(DistinctStats {
        parent_non_null_rows: row.count("ParentNonNull", CONTEXT)?,
        parent_distinct_values: row.count("ParentDistinct", CONTEXT)?,
        referenced_distinct_values: row.count("ReferencedDistinct", CONTEXT)?,
    })
}

/// Derives the relationship metrics from counts and the histogram.
///
/// `distinct` selects the cardinality basis: distinct statistics when
/// present, whole-table row counts otherwise.
pub fn analyze(
    parent_rows: u64,
    referenced_rows: u64,
    entries: &[FkDistributionEntry],
    distinct: Option<DistinctStats>,
) -> RelationshipAnalysis {
    let (cardinality, cardinality_basis) = match &distinct {
        Some(stats) => (classify_distinct(stats), CardinalityBasis::Distinct),
        None => (
            classify_cardinality(parent_rows, referenced_rows),
            CardinalityBasis::TableSize,
        ),
    };
    let ratio = distribution_ratio(parent_rows, referenced_rows);

    RelationshipAnalysis {
        parent_row_count: parent_rows,
        referenced_row_count: referenced_rows,
        cardinality,
        cardinality_basis,
        distribution_ratio: ratio,
        pattern: classify_pattern(ratio),
        health: assess_health(parent_rows, referenced_rows, entries),
        performance_indicator: performance_indicator(parent_rows),
        distinct,
    }
}

/// Size of one endpoint table: the survey's row count when present,
/// otherwise a partition-statistics lookup for that table alone.
///
/// # Errors
/// Returns `ScoutError::Query` from the lookup.
async fn table_size(
    source: &dyn CatalogSource,
    table: &ColumnRef,
    row_counts: &HashMap<String, u64>,
) -> Result<Option<u64>> {
    if let Some(rows) = row_counts.get(&table.qualified_table()) {
        return Ok(Some(*rows));
    }
    tracing::debug!("No survey row count for {}, reading partition statistics", table.qualified_table());
    fetch_table_row_count(source, &table.schema, &table.table).await
}

/// Analyses one relationship, isolating non-fatal failures.
///
/// Table sizes come from `row_counts` (keyed by `schema.table`), or from a
/// per-table partition-statistics lookup for tables missing from it. The
/// histogram is never used as a size: it is truncated to the top N. When a
/// size cannot be determined the histogram is kept, `analysis` stays unset
/// and the reason is recorded in [`FkDistribution::error`].
///
/// # Errors
/// Only fatal errors are returned; query failures land in
/// [`FkDistribution::error`].
pub async fn analyze_relationship(
    source: &dyn CatalogSource,
    fk: &ForeignKeyInfo,
    config: &AnalysisConfig,
    row_counts: &HashMap<String, u64>,
) -> Result<FkDistribution> {
    let mut distribution = FkDistribution::for_foreign_key(fk);

    let entries = match fetch_distribution(source, fk, config).await {
        Ok(entries) => entries,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!("Distribution failed for {}: {}", distribution.relationship, e);
            distribution.error = Some(e.to_string());
            return Ok(distribution);
        }
    };

    let mut sizes = [0_u64; 2];
    for (slot, table) in sizes.iter_mut().zip([&fk.parent, &fk.referenced]) {
        let reason = match table_size(source, table, row_counts).await {
            Ok(Some(rows)) => {
                *slot = rows;
                continue;
            }
            Ok(None) => "no partition statistics".to_string(),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => e.to_string(),
        };
        tracing::warn!(
            "Size of {} unknown, {} not classified: {}",
            table.qualified_table(),
            distribution.relationship,
            reason
        );
        distribution.error = Some(format!(
            "size of {} unknown, relationship not classified: {}",
            table.qualified_table(),
            reason
        ));
        distribution.top = entries;
        return Ok(distribution);
    }
    let [parent_rows, referenced_rows] = sizes;

    let distinct = match config.cardinality_mode {
        CardinalityMode::TableSize => None,
        CardinalityMode::Distinct => match fetch_distinct_stats(source, fk).await {
            Ok(stats) => Some(stats),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "Distinct statistics failed for {}, falling back to table sizes: {}",
                    distribution.relationship,
                    e
                );
                None
            }
        },
    };

    distribution.analysis = Some(analyze(parent_rows, referenced_rows, &entries, distinct));
    distribution.top = entries;
    Ok(distribution)
}

/// Analyses every relationship with at most `config.concurrency` in flight.
///
/// # Errors
/// Returns the first fatal error; all other failures are isolated per
/// relationship and listed in [`DistributionOutcome::warnings`].
pub async fn analyze_distributions(
    source: &dyn CatalogSource,
    foreign_keys: &[ForeignKeyInfo],
    config: &AnalysisConfig,
    row_counts: &[TableRowCount],
) -> Result<DistributionOutcome> {
    let sizes: HashMap<String, u64> = row_counts
        .iter()
        .map(|c| (c.table.clone(), c.rows))
        .collect();
    let concurrency = config.concurrency.max(1) as usize;

    tracing::info!(
        "Analysing {} relationships (top_n={}, concurrency={}, cardinality={:?})",
        foreign_keys.len(),
        config.top_n,
        concurrency,
        config.cardinality_mode
    );

    let distributions: Vec<FkDistribution> = stream::iter(foreign_keys)
        .map(|fk| analyze_relationship(source, fk, config, &sizes))
        .buffered(concurrency)
        .try_collect()
        .await?;

    let warnings = distributions
        .iter()
        .filter_map(|d| {
            d.error
                .as_ref()
                .map(|e| format!("distribution for {} ({}): {}", d.relationship, d.constraint_name, e))
        })
        .collect();

    Ok(DistributionOutcome {
        distributions,
        warnings,
    })
}
