//! Type conversion utilities for SQLite.

use rusqlite::types::{Value, ValueRef};
use tidemark_migrate::SqlValue;

/// Convert an engine value to a SQLite value for binding.
pub fn to_sqlite_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Int(i) => Value::Integer(i),
        // SQLite integers are signed 64-bit
        SqlValue::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        SqlValue::Float(f) => Value::Real(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Bytes(b) => Value::Blob(b),
    }
}

/// Convert a SQLite value reference to an engine value.
pub fn from_sqlite_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Bytes(bytes.to_vec()),
    }
}

/// Get a value from a row at the given column index.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> SqlValue {
    row.get_ref(index)
        .map(from_sqlite_value)
        .unwrap_or(SqlValue::Null)
}
