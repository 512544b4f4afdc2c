//! Relationship classifiers.
//!
//! Pure functions over counts. Cutoffs are fixed so that reports stay
//! comparable between runs and with older reports.

use crate::models::{
    Cardinality, DistinctStats, DistributionPattern, FkDistributionEntry, PerformanceIndicator,
    RelationshipHealth,
};

/// Parent rows at or above which joins are considered high volume
pub const HIGH_VOLUME_ROWS: u64 = 1_000_000;

/// Parent rows at or above which joins are considered medium volume
pub const MEDIUM_VOLUME_ROWS: u64 = 100_000;

/// Classifies multiplicity from whole-table row counts.
///
/// This is a table-size heuristic: it compares how many rows each table
/// holds, not how many distinct key values are used. See
/// [`classify_distinct`] for the observed multiplicity.
///
/// ```rust
/// use sqlscout_core::analysis::classify_cardinality;
/// use sqlscout_core::models::Cardinality;
///
/// assert_eq!(classify_cardinality(100, 1), Cardinality::OneToMany);
/// assert_eq!(classify_cardinality(0, 5), Cardinality::Undefined);
/// ```
pub fn classify_cardinality(parent_count: u64, referenced_count: u64) -> Cardinality {
    match (parent_count, referenced_count) {
        (0, _) | (_, 0) => Cardinality::Undefined,
        (1, 1) => Cardinality::OneToOne,
        (_, 1) => Cardinality::OneToMany,
        (1, _) => Cardinality::ManyToOne,
        _ => Cardinality::ManyToMany,
    }
}

/// Classifies multiplicity from distinct FK values.
///
/// A foreign key always points at one referenced row, so the only question
/// is whether a referenced value is used by more than one parent row.
pub fn classify_distinct(stats: &DistinctStats) -> Cardinality {
    if stats.parent_non_null_rows == 0 || stats.referenced_distinct_values == 0 {
        Cardinality::Undefined
    } else if stats.parent_distinct_values == stats.parent_non_null_rows {
        Cardinality::OneToOne
    } else {
        Cardinality::OneToMany
    }
}

/// Parent rows per referenced row; 0.0 when the referenced table is empty.
#[allow(clippy::cast_precision_loss)]
pub fn distribution_ratio(parent_count: u64, referenced_count: u64) -> f64 {
    if referenced_count == 0 {
        0.0
    } else {
        parent_count as f64 / referenced_count as f64
    }
}

/// Buckets a distribution ratio.
#[allow(clippy::float_cmp)]
pub fn classify_pattern(ratio: f64) -> DistributionPattern {
    if ratio <= 0.0 || ratio.is_nan() {
        DistributionPattern::NoData
    } else if ratio >= 10.0 {
        DistributionPattern::HighFanout
    } else if ratio >= 3.0 {
        DistributionPattern::ModerateFanout
    } else if ratio > 1.0 {
        DistributionPattern::LowFanout
    } else if ratio == 1.0 {
        DistributionPattern::Balanced
    } else if ratio <= 0.1 {
        DistributionPattern::HighConcentration
    } else if ratio <= 0.5 {
        DistributionPattern::ModerateConcentration
    } else {
        DistributionPattern::LowConcentration
    }
}

/// Coarse usage health of a relationship.
///
/// Checked in order: empty referenced table, unused (no parent rows), sparse
/// (more than half of the returned values are unreferenced), skewed (the
/// busiest value holds more than 80% of parent rows), otherwise healthy.
pub fn assess_health(
    parent_rows: u64,
    referenced_rows: u64,
    entries: &[FkDistributionEntry],
) -> RelationshipHealth {
    if referenced_rows == 0 {
        return RelationshipHealth::EmptyReference;
    }
    if parent_rows == 0 {
        return RelationshipHealth::Unused;
    }

    let zero_entries = entries.iter().filter(|e| e.count == 0).count();
    if !entries.is_empty() && zero_entries * 2 > entries.len() {
        return RelationshipHealth::Sparse;
    }

    let top = entries.iter().map(|e| e.count).max().unwrap_or(0);
    if entries.len() >= 2 && u128::from(top) * 5 > u128::from(parent_rows) * 4 {
        return RelationshipHealth::Skewed;
    }

    RelationshipHealth::Healthy
}

/// Buckets the parent table size.
pub fn performance_indicator(parent_rows: u64) -> PerformanceIndicator {
    if parent_rows >= HIGH_VOLUME_ROWS {
        PerformanceIndicator::HighVolume
    } else if parent_rows >= MEDIUM_VOLUME_ROWS {
        PerformanceIndicator::MediumVolume
    } else {
        PerformanceIndicator::LowVolume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RefValue;

    fn entries(counts: &[u64]) -> Vec<FkDistributionEntry> {
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| FkDistributionEntry::new(RefValue::Integer(i as i64), *c))
            .collect()
    }

    #[test]
    fn test_cardinality_table() {
        let cases = [
            ((1, 1), Cardinality::OneToOne),
            ((100, 1), Cardinality::OneToMany),
            ((1, 100), Cardinality::ManyToOne),
            ((50, 20), Cardinality::ManyToMany),
            ((0, 7), Cardinality::Undefined),
            ((7, 0), Cardinality::Undefined),
            ((0, 0), Cardinality::Undefined),
        ];
        for ((parent, referenced), expected) in cases {
            assert_eq!(
                classify_cardinality(parent, referenced),
                expected,
                "parent={} referenced={}",
                parent,
                referenced
            );
        }
    }

    #[test]
    fn test_distinct_cardinality() {
        let one_to_one = DistinctStats {
            parent_non_null_rows: 10,
            parent_distinct_values: 10,
            referenced_distinct_values: 40,
        };
        assert_eq!(classify_distinct(&one_to_one), Cardinality::OneToOne);

        let one_to_many = DistinctStats {
            parent_non_null_rows: 10,
            parent_distinct_values: 3,
            referenced_distinct_values: 3,
        };
        assert_eq!(classify_distinct(&one_to_many), Cardinality::OneToMany);

        let unused = DistinctStats {
            parent_non_null_rows: 0,
            parent_distinct_values: 0,
            referenced_distinct_values: 3,
        };
        assert_eq!(classify_distinct(&unused), Cardinality::Undefined);
    }

    #[test]
    fn test_ratio_and_pattern() {
        let ratio = distribution_ratio(100, 10);
        assert!((ratio - 10.0).abs() < f64::EPSILON);
        assert_eq!(classify_pattern(ratio), DistributionPattern::HighFanout);

        assert!(distribution_ratio(5, 0).abs() < f64::EPSILON);
        assert_eq!(classify_pattern(0.0), DistributionPattern::NoData);
    }

    #[test]
    fn test_pattern_cutoffs_are_exact() {
        let cases = [
            (10.0, DistributionPattern::HighFanout),
            (9.99, DistributionPattern::ModerateFanout),
            (3.0, DistributionPattern::ModerateFanout),
            (2.99, DistributionPattern::LowFanout),
            (1.01, DistributionPattern::LowFanout),
            (1.0, DistributionPattern::Balanced),
            (0.99, DistributionPattern::LowConcentration),
            (0.5, DistributionPattern::ModerateConcentration),
            (0.11, DistributionPattern::ModerateConcentration),
            (0.1, DistributionPattern::HighConcentration),
            (0.001, DistributionPattern::HighConcentration),
        ];
        for (ratio, expected) in cases {
            assert_eq!(classify_pattern(ratio), expected, "ratio={}", ratio);
        }
    }

    #[test]
    fn test_health_rules() {
        assert_eq!(assess_health(10, 0, &[]), RelationshipHealth::EmptyReference);
        assert_eq!(assess_health(0, 0, &[]), RelationshipHealth::EmptyReference);
        assert_eq!(assess_health(0, 3, &entries(&[0, 0, 0])), RelationshipHealth::Unused);
        assert_eq!(assess_health(5, 4, &entries(&[5, 0, 0, 0])), RelationshipHealth::Sparse);
        assert_eq!(assess_health(100, 3, &entries(&[90, 6, 4])), RelationshipHealth::Skewed);
        assert_eq!(assess_health(100, 3, &entries(&[40, 35, 25])), RelationshipHealth::Healthy);
        // A single value holding everything is not skew
        assert_eq!(assess_health(100, 1, &entries(&[100])), RelationshipHealth::Healthy);
        // Exactly 80% is not skewed
        assert_eq!(assess_health(100, 2, &entries(&[80, 20])), RelationshipHealth::Healthy);
    }

    #[test]
    fn test_performance_indicator() {
        assert_eq!(performance_indicator(0), PerformanceIndicator::LowVolume);
        assert_eq!(performance_indicator(99_999), PerformanceIndicator::LowVolume);
        assert_eq!(performance_indicator(100_000), PerformanceIndicator::MediumVolume);
        assert_eq!(performance_indicator(1_000_000), PerformanceIndicator::HighVolume);
    }
}
