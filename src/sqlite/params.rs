use rusqlite::types::Value;

use crate::types::SqlValue;

/// Convert a bound `SqlValue` to a rusqlite `Value`.
///
/// `SQLite` has no native date, time or JSON types; those are stored as text in
/// the formats the scalar decoders parse back.
#[must_use]
pub fn sql_value_to_sqlite(value: SqlValue) -> Value {
    match value {
        SqlValue::Int(i) => Value::Integer(i),
        SqlValue::Float(f) => Value::Real(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Bool(b) => Value::Integer(i64::from(b)),
        SqlValue::Date(d) => Value::Text(d.format("%F").to_string()),
        SqlValue::Time(t) => Value::Text(t.format("%T%.f").to_string()),
        SqlValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        SqlValue::Null => Value::Null,
        SqlValue::Json(json) => Value::Text(json.to_string()),
        SqlValue::Blob(bytes) => Value::Blob(bytes),
    }
}

#[must_use]
pub fn sqlite_to_sql_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}

/// Extract one cell of a `SQLite` row (0-based `idx`).
///
/// # Errors
///
/// Returns `rusqlite::Error` if the column does not exist.
pub fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<SqlValue, rusqlite::Error> {
    let value: Value = row.get(idx)?;
    Ok(sqlite_to_sql_value(value))
}
