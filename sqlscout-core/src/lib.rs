//! Core library for SQLScout.
//!
//! This crate holds everything shared by the collector and the report
//! post-processor: the report model, the catalog source seam and its
//! SQL Server implementation, the catalog fetchers, the foreign key
//! distribution analyzer and the report serializer.
//!
//! # Security Guarantees
//! - All database operations are read-only catalog or aggregate queries
//! - No credentials stored in reports or included in logs and errors
//! - Reports are validated against an embedded JSON Schema before writing
//!
//! # Architecture
//! - `adapters`: [`adapters::CatalogSource`] trait, SQL Server session, scripted catalog
//! - `collection`: schema, foreign key and row count fetchers
//! - `analysis`: referenced-value histograms and relationship classifiers
//! - `pipeline`: the fixed survey sequence
//! - `report`: report builder, YAML/JSON encode and strict decode

pub mod adapters;
pub mod analysis;
pub mod collection;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod queries;
pub mod report;
pub mod security;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use adapters::{
    AnalysisConfig, CardinalityMode, CatalogSource, ConnectionParams, EncryptMode,
    ScriptedCatalog, SqlRow, SqlValue,
};
pub use error::{Result, ScoutError};
pub use logging::{LogFormat, init_logging};
pub use models::{
    Cardinality, ColumnInfo, ColumnRef, DistributionPattern, FkDistribution,
    FkDistributionEntry, ForeignKeyInfo, PerformanceIndicator, RefValue, RelationshipHealth,
    SchemaReport, TableInfo, TableRowCount,
};
pub use pipeline::{SurveyOptions, run_survey, survey_source};
pub use report::{
    ReportBuilder, ReportFormat, decode_report, encode_report, read_report, redact_report,
    write_report,
};
pub use session::ConnectionManager;

pub use validation::{
    ValidationError, get_schema_definition, initialize_schema_validator, validate_report_value,
};
