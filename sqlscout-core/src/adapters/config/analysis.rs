//! Distribution analysis configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ScoutError;

/// Upper bound for concurrently analysed relationships
pub const MAX_CONCURRENCY: u32 = 32;

/// What the cardinality label is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityMode {
    /// Distinct FK values on both columns (one extra aggregate per FK)
    #[default]
    Distinct,
    /// Whole-table row counts, as older reports did
    TableSize,
}

impl FromStr for CardinalityMode {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "distinct" => Ok(Self::Distinct),
            "table_size" => Ok(Self::TableSize),
            other => Err(ScoutError::configuration(format!(
                "Invalid cardinality mode '{}'; expected distinct or table_size",
                other
            ))),
        }
    }
}

/// Configuration for FK distribution analysis.
///
/// # Example
/// ```rust
/// use sqlscout_core::adapters::{AnalysisConfig, CardinalityMode};
///
/// let config = AnalysisConfig::new()
///     .with_top_n(5)
///     .with_include_zeroes(false)
///     .with_cardinality_mode(CardinalityMode::TableSize);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Referenced values kept per relationship; 0 means unbounded
    pub top_n: u32,
    /// Keep referenced values that no parent row points at
    pub include_zeroes: bool,
    /// How cardinality is decided
    pub cardinality_mode: CardinalityMode,
    /// Relationships analysed at the same time
    pub concurrency: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: 50,
            include_zeroes: true,
            cardinality_mode: CardinalityMode::default(),
            concurrency: 4,
        }
    }
}

impl AnalysisConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the analysis configuration.
    ///
    /// # Errors
    /// Returns error if concurrency is zero or above the safety limit
    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 {
            return Err(ScoutError::configuration(
                "concurrency must be greater than 0",
            ));
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(ScoutError::configuration(format!(
                "concurrency should not exceed {}",
                MAX_CONCURRENCY
            )));
        }

        if self.top_n == 0 {
            tracing::warn!("top_n is 0: distribution queries will return every referenced value");
        }

        Ok(())
    }

    /// Builder method to set the per-relationship value limit.
    pub fn with_top_n(mut self, top_n: u32) -> Self {
        self.top_n = top_n;
        self
    }

    /// Builder method to keep or drop zero-count values.
    pub fn with_include_zeroes(mut self, include_zeroes: bool) -> Self {
        self.include_zeroes = include_zeroes;
        self
    }

    /// Builder method to set the cardinality basis.
    pub fn with_cardinality_mode(mut self, mode: CardinalityMode) -> Self {
        self.cardinality_mode = mode;
        self
    }

    /// Builder method to set concurrency.
    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_default() {
        let config = AnalysisConfig::default();
        assert_eq!(config.top_n, 50);
        assert!(config.include_zeroes);
        assert_eq!(config.cardinality_mode, CardinalityMode::Distinct);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_analysis_config_validation() {
        assert!(AnalysisConfig::new().validate().is_ok());
        assert!(AnalysisConfig::new().with_top_n(0).validate().is_ok());
        assert!(AnalysisConfig::new().with_concurrency(0).validate().is_err());
        assert!(
            AnalysisConfig::new()
                .with_concurrency(MAX_CONCURRENCY + 1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_cardinality_mode_parse() {
        assert_eq!(
            "table-size".parse::<CardinalityMode>().unwrap(),
            CardinalityMode::TableSize
        );
        assert_eq!(
            "DISTINCT".parse::<CardinalityMode>().unwrap(),
            CardinalityMode::Distinct
        );
        assert!("rows".parse::<CardinalityMode>().is_err());
    }
}
