//! Core data models for the relationship survey report.
//!
//! Every entity is request-scoped: it is built from catalog rows, merged into
//! a [`SchemaReport`], serialized once and dropped. Field names match the
//! on-disk report keys so the structs double as the file format.

use serde::{Deserialize, Serialize};

/// Column description as reported by `INFORMATION_SCHEMA.COLUMNS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub column_name: String,
    /// SQL Server type name, e.g. `nvarchar`
    pub data_type: String,
    /// True when the column accepts NULL
    pub is_nullable: bool,
}

impl ColumnInfo {
    /// Creates a column description.
    pub fn new(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: bool,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable,
        }
    }
}

/// Table (or view) with its columns in declared ordinal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Qualified name, `schema.table`
    pub table_name: String,
    /// Columns in ordinal order
    pub columns: Vec<ColumnInfo>,
    /// Partition-statistics row count; `None` for views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Inline error marker when this table's row count could not be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count_error: Option<String>,
}

impl TableInfo {
    /// Creates an empty table entry for a qualified `schema.table` name.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            row_count: None,
            row_count_error: None,
        }
    }

    /// Splits the qualified name into `(schema, table)`.
    ///
    /// Names without a schema prefix are returned with an empty schema. Only
    /// the first dot separates, so table names containing dots survive.
    pub fn schema_and_name(&self) -> (&str, &str) {
        self.table_name
            .split_once('.')
            .unwrap_or(("", self.table_name.as_str()))
    }

    /// Looks up a column by name (case-sensitive).
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.column_name == name)
    }
}

/// One endpoint of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Owning schema, e.g. `dbo`
    pub schema: String,
    /// Table name without schema
    pub table: String,
    /// Column name
    pub column: String,
}

impl ColumnRef {
    /// Creates a column reference.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// Returns `schema.table`, the same form used by [`TableInfo::table_name`].
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column)
    }
}

/// Foreign key column pair. Composite keys produce one entry per column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    /// Constraint name
    #[serde(alias = "fk_name")]
    pub constraint_name: String,
    /// Referencing column
    pub parent: ColumnRef,
    /// Referenced key column
    pub referenced: ColumnRef,
}

impl ForeignKeyInfo {
    /// Creates a foreign key description.
    pub fn new(constraint_name: impl Into<String>, parent: ColumnRef, referenced: ColumnRef) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            parent,
            referenced,
        }
    }

    /// Relationship key in the form `parent_schema.parent_table->ref_schema.ref_table`.
    pub fn relationship_key(&self) -> String {
        format!(
            "{}->{}",
            self.parent.qualified_table(),
            self.referenced.qualified_table()
        )
    }
}

/// Scalar value of a referenced key column.
///
/// Key columns are usually integers, strings or GUIDs; anything else is
/// rendered as text by the driver layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for RefValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefValue::Null => write!(f, "NULL"),
            RefValue::Bool(b) => write!(f, "{}", b),
            RefValue::Integer(i) => write!(f, "{}", i),
            RefValue::Float(x) => write!(f, "{}", x),
            RefValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// How many parent rows reference one referenced key value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FkDistributionEntry {
    /// Referenced key value
    pub ref_value: RefValue,
    /// Parent rows pointing at it
    pub count: u64,
}

impl FkDistributionEntry {
    /// Creates a histogram entry.
    pub fn new(ref_value: RefValue, count: u64) -> Self {
        Self { ref_value, count }
    }
}

/// Partition-statistics row count for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowCount {
    /// Qualified name, `schema.table`
    pub table: String,
    /// Sum of heap or clustered index partition rows
    pub rows: u64,
}

/// Relationship multiplicity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "1:many")]
    OneToMany,
    #[serde(rename = "many:1")]
    ManyToOne,
    #[serde(rename = "many:many")]
    ManyToMany,
    #[serde(rename = "undefined")]
    Undefined,
}

impl Cardinality {
    /// Returns the label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "1:1",
            Cardinality::OneToMany => "1:many",
            Cardinality::ManyToOne => "many:1",
            Cardinality::ManyToMany => "many:many",
            Cardinality::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the cardinality label was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityBasis {
    /// Whole-table partition row counts (compatibility mode)
    TableSize,
    /// Distinct key values on both FK columns
    #[default]
    Distinct,
}

/// Fanout bucket derived from the distribution ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionPattern {
    NoData,
    HighFanout,
    ModerateFanout,
    LowFanout,
    Balanced,
    LowConcentration,
    ModerateConcentration,
    HighConcentration,
}

impl std::fmt::Display for DistributionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DistributionPattern::NoData => "no_data",
            DistributionPattern::HighFanout => "high_fanout",
            DistributionPattern::ModerateFanout => "moderate_fanout",
            DistributionPattern::LowFanout => "low_fanout",
            DistributionPattern::Balanced => "balanced",
            DistributionPattern::LowConcentration => "low_concentration",
            DistributionPattern::ModerateConcentration => "moderate_concentration",
            DistributionPattern::HighConcentration => "high_concentration",
        };
        f.write_str(label)
    }
}

/// Coarse usage health of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipHealth {
    Healthy,
    Skewed,
    Sparse,
    Unused,
    EmptyReference,
}

impl std::fmt::Display for RelationshipHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RelationshipHealth::Healthy => "healthy",
            RelationshipHealth::Skewed => "skewed",
            RelationshipHealth::Sparse => "sparse",
            RelationshipHealth::Unused => "unused",
            RelationshipHealth::EmptyReference => "empty_reference",
        };
        f.write_str(label)
    }
}

/// Join volume bucket from the parent table size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceIndicator {
    LowVolume,
    MediumVolume,
    HighVolume,
}

/// Distinct-value statistics for one FK column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinctStats {
    /// Parent rows with a non-null FK value
    pub parent_non_null_rows: u64,
    /// Distinct non-null FK values in the parent
    pub parent_distinct_values: u64,
    /// Distinct key values in the referenced table
    pub referenced_distinct_values: u64,
}

/// Derived metrics for one relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAnalysis {
    /// Rows in the referencing table
    pub parent_row_count: u64,
    /// Rows in the referenced table
    pub referenced_row_count: u64,
    /// Relationship multiplicity
    pub cardinality: Cardinality,
    /// Which statistics decided `cardinality`
    pub cardinality_basis: CardinalityBasis,
    /// Parent rows per referenced row; 0 when the referenced table is empty
    pub distribution_ratio: f64,
    /// Fan-out band derived from the ratio
    pub pattern: DistributionPattern,
    /// Overall relationship health
    pub health: RelationshipHealth,
    /// Volume band from the parent row count
    pub performance_indicator: PerformanceIndicator,
    /// Present only in distinct-values cardinality mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<DistinctStats>,
}

/// Reference-value histogram and analysis for one foreign key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FkDistribution {
    /// `parent_schema.parent_table->ref_schema.ref_table`
    pub relationship: String,
    /// Constraint name
    #[serde(alias = "fk_name")]
    pub constraint_name: String,
    /// Referencing column
    pub parent: ColumnRef,
    /// Referenced key column
    pub referenced: ColumnRef,
    /// Busiest referenced values first, at most `top_n`
    #[serde(default)]
    pub top: Vec<FkDistributionEntry>,
    /// Derived metrics; absent when the relationship could not be classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<RelationshipAnalysis>,
    /// Inline error marker when this relationship could not be analysed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FkDistribution {
    /// Creates an empty distribution for a foreign key.
    pub fn for_foreign_key(fk: &ForeignKeyInfo) -> Self {
        Self {
            relationship: fk.relationship_key(),
            constraint_name: fk.constraint_name.clone(),
            parent: fk.parent.clone(),
            referenced: fk.referenced.clone(),
            top: Vec::new(),
            analysis: None,
            error: None,
        }
    }

    /// Sum of all returned counts.
    pub fn total_count(&self) -> u64 {
        self.top.iter().map(|e| e.count).sum()
    }

    /// Number of returned referenced values with no referencing rows.
    pub fn zero_count_values(&self) -> usize {
        self.top.iter().filter(|e| e.count == 0).count()
    }
}

/// Run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Tables in the report
    pub total_tables: usize,
    /// UTC time the survey finished
    pub analysis_timestamp: chrono::DateTime<chrono::Utc>,
    /// Version of the collector that wrote the report
    #[serde(default)]
    pub tool_version: String,
    /// Wall-clock survey time
    #[serde(default)]
    pub duration_ms: u64,
    /// Isolated failures collected during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The report artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaReport {
    /// Surveyed database
    pub database_name: String,
    /// Tables and views, ordered by name
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    /// One entry per foreign key column pair
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
    /// Absent when row counts were skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_counts: Option<Vec<TableRowCount>>,
    /// Absent when distribution analysis was not requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk_distributions: Option<Vec<FkDistribution>>,
    /// Run metadata written by the collector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_metadata: Option<AnalysisMetadata>,
    /// Free-form operator notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SchemaReport {
    /// Creates an empty report for a database.
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            tables: Vec::new(),
            foreign_keys: Vec::new(),
            row_counts: None,
            fk_distributions: None,
            analysis_metadata: None,
            notes: None,
        }
    }

    /// Looks up a table by qualified name.
    pub fn table(&self, qualified_name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.table_name == qualified_name)
    }

    /// Total number of columns across all tables.
    pub fn total_columns(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Foreign keys whose parent or referenced table is not in `tables`.
    ///
    /// Tables can disappear between queries or be hidden by permissions;
    /// such references are reported, never rejected.
    pub fn dangling_foreign_keys(&self) -> Vec<&ForeignKeyInfo> {
        self.foreign_keys
            .iter()
            .filter(|fk| {
                self.table(&fk.parent.qualified_table()).is_none()
                    || self.table(&fk.referenced.qualified_table()).is_none()
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn movies_fk() -> ForeignKeyInfo {
        ForeignKeyInfo::new(
            "FK_Movies_Genres",
            ColumnRef::new("dbo", "Movies", "GenreID"),
            ColumnRef::new("dbo", "Genres", "GenreID"),
        )
    }

    #[test]
    fn test_schema_and_name_split() {
        let table = TableInfo::new("dbo.Movies");
        assert_eq!(table.schema_and_name(), ("dbo", "Movies"));

        let dotted = TableInfo::new("sales.Order.Lines");
        assert_eq!(dotted.schema_and_name(), ("sales", "Order.Lines"));

        let bare = TableInfo::new("Movies");
        assert_eq!(bare.schema_and_name(), ("", "Movies"));
    }

    #[test]
    fn test_relationship_key() {
        assert_eq!(movies_fk().relationship_key(), "dbo.Movies->dbo.Genres");
    }

    #[test]
    fn test_fk_name_alias_accepted() {
        let json = r#"{
            "fk_name": "FK_Movies_Genres",
            "parent": {"schema": "dbo", "table": "Movies", "column": "GenreID"},
            "referenced": {"schema": "dbo", "table": "Genres", "column": "GenreID"}
        }"#;
        let fk: ForeignKeyInfo = serde_json::from_str(json).unwrap();
        assert_eq!(fk, movies_fk());
    }

    #[test]
    fn test_cardinality_labels_serialize() {
        assert_eq!(
            serde_json::to_string(&Cardinality::OneToMany).unwrap(),
            "\"1:many\""
        );
        assert_eq!(
            serde_json::from_str::<Cardinality>("\"many:many\"").unwrap(),
            Cardinality::ManyToMany
        );
        assert_eq!(Cardinality::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_ref_value_untagged() {
        let values: Vec<RefValue> = serde_json::from_str(r#"[null, true, 7, 2.5, "A-1"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                RefValue::Null,
                RefValue::Bool(true),
                RefValue::Integer(7),
                RefValue::Float(2.5),
                RefValue::Text("A-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_dangling_foreign_keys_tolerated() {
        let mut report = SchemaReport::new("MovieReviews");
        report.tables.push(TableInfo::new("dbo.Movies"));
        report.foreign_keys.push(movies_fk());

        let dangling = report.dangling_foreign_keys();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].referenced.table, "Genres");

        report.tables.push(TableInfo::new("dbo.Genres"));
        assert!(report.dangling_foreign_keys().is_empty());
    }

    #[test]
    fn test_distribution_totals() {
        let mut dist = FkDistribution::for_foreign_key(&movies_fk());
        dist.top = vec![
            FkDistributionEntry::new(RefValue::Integer(1), 30),
            FkDistributionEntry::new(RefValue::Integer(2), 0),
            FkDistributionEntry::new(RefValue::Integer(3), 12),
        ];
        assert_eq!(dist.total_count(), 42);
        assert_eq!(dist.zero_count_values(), 1);
        assert_eq!(dist.relationship, "dbo.Movies->dbo.Genres");
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let json = r#"{"database_name": "x", "raw": "free text"}"#;
        assert!(serde_json::from_str::<SchemaReport>(json).is_err());
    }
}
