//! Foreign key distribution analysis.
//!
//! - `classify`: pure classifiers (cardinality, ratio, pattern, health, volume)
//! - `distribution`: histogram queries and per-relationship analysis

mod classify;
mod distribution;

pub use classify::{
    HIGH_VOLUME_ROWS, MEDIUM_VOLUME_ROWS, assess_health, classify_cardinality, classify_distinct,
    classify_pattern, distribution_ratio, performance_indicator,
};
pub use distribution::{
    DistributionOutcome, analyze, analyze_distributions, analyze_relationship,
    fetch_distinct_stats, fetch_distribution,
};
