//! TDS column value conversion.
//!
//! Maps tiberius `ColumnData` onto the driver-neutral [`SqlValue`]. Integer,
//! float, bit and string types map directly; everything else is rendered as
//! text so that unusual key types (GUIDs, decimals, dates) still show up in
//! distribution histograms.

use tiberius::{ColumnData, FromSql};

use crate::adapters::{SqlRow, SqlValue};

/// Converts one cell.
pub(crate) fn to_sql_value(data: &ColumnData<'static>) -> SqlValue {
    match data {
        ColumnData::U8(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        ColumnData::I16(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        ColumnData::I32(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        ColumnData::I64(v) => v.map_or(SqlValue::Null, SqlValue::Int),
        ColumnData::F32(v) => v.map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))),
        ColumnData::F64(v) => v.map_or(SqlValue::Null, SqlValue::Float),
        ColumnData::Bit(v) => v.map_or(SqlValue::Null, SqlValue::Bool),
        ColumnData::String(v) => v
            .as_ref()
            .map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string())),
        ColumnData::Guid(v) => v
            .as_ref()
            .map_or(SqlValue::Null, |g| SqlValue::Text(g.to_string())),
        ColumnData::Numeric(v) => v.as_ref().map_or(SqlValue::Null, |n| {
            if n.scale() == 0 {
                i64::try_from(n.value())
                    .map(SqlValue::Int)
                    .unwrap_or_else(|_| SqlValue::Text(n.to_string()))
            } else {
                SqlValue::Text(n.to_string())
            }
        }),
        ColumnData::Binary(v) => v.as_ref().map_or(SqlValue::Null, |bytes| {
            let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            SqlValue::Text(format!("0x{}", hex))
        }),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            temporal::<chrono::NaiveDateTime>(data)
        }
        ColumnData::Date(_) => temporal::<chrono::NaiveDate>(data),
        ColumnData::Time(_) => temporal::<chrono::NaiveTime>(data),
        ColumnData::DateTimeOffset(_) => temporal::<chrono::DateTime<chrono::FixedOffset>>(data),
        other => SqlValue::Text(format!("{:?}", other)),
    }
}

fn temporal<'a, T>(data: &'a ColumnData<'static>) -> SqlValue
where
    T: FromSql<'a> + std::fmt::Display,
{
    match T::from_sql(data) {
        Ok(Some(value)) => SqlValue::Text(value.to_string()),
        Ok(None) => SqlValue::Null,
        Err(e) => {
            tracing::debug!("Unreadable temporal value: {}", e);
            SqlValue::Text(format!("{:?}", data))
        }
    }
}

/// Converts a full row, keeping column names and order.
pub(crate) fn to_sql_row(row: &tiberius::Row) -> SqlRow {
    let mut out = SqlRow::new();
    for (column, data) in row.cells() {
        out.push(column.name(), to_sql_value(data));
    }
    out
}
