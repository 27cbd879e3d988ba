//! Type conversion utilities for MySQL.

use mysql_async::{Params, Row, Value};
use tidemark_migrate::SqlValue;

/// Convert an engine value to a MySQL value for binding.
pub fn to_mysql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Int(i) => Value::Int(i),
        SqlValue::UInt(u) => Value::UInt(u),
        SqlValue::Float(f) => Value::Double(f),
        SqlValue::Text(s) => Value::Bytes(s.into_bytes()),
        SqlValue::Bytes(b) => Value::Bytes(b),
    }
}

/// Build positional parameters, or none for an empty list.
pub fn to_params(params: Vec<SqlValue>) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.into_iter().map(to_mysql_value).collect())
    }
}

/// Convert a MySQL value to an engine value.
///
/// Text columns arrive as bytes; valid UTF-8 becomes text. Dates and times
/// are rendered the way MySQL prints them.
pub fn from_mysql_value(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => SqlValue::Text(s),
            Err(e) => SqlValue::Bytes(e.into_bytes()),
        },
        Value::Int(i) => SqlValue::Int(i),
        Value::UInt(u) => SqlValue::UInt(u),
        Value::Float(f) => SqlValue::Float(f64::from(f)),
        Value::Double(d) => SqlValue::Float(d),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            let mut out = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micro > 0 {
                out.push_str(&format!(".{:06}", micro));
            }
            SqlValue::Text(out)
        }
        Value::Time(is_neg, days, hours, minutes, seconds, micro) => {
            let sign = if is_neg { "-" } else { "" };
            let mut out = format!(
                "{}{:02}:{:02}:{:02}",
                sign,
                days * 24 + u32::from(hours),
                minutes,
                seconds
            );
            if micro > 0 {
                out.push_str(&format!(".{:06}", micro));
            }
            SqlValue::Text(out)
        }
    }
}

/// Convert a row to engine values, positionally.
pub fn row_values(row: &Row) -> Vec<SqlValue> {
    (0..row.len())
        .map(|i| {
            row.as_ref(i)
                .cloned()
                .map(from_mysql_value)
                .unwrap_or(SqlValue::Null)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mysql_value() {
        assert_eq!(to_mysql_value(SqlValue::Null), Value::NULL);
        assert_eq!(to_mysql_value(SqlValue::Int(-1)), Value::Int(-1));
        assert_eq!(
            to_mysql_value(SqlValue::from("abc")),
            Value::Bytes(b"abc".to_vec())
        );
    }

    #[test]
    fn test_to_params() {
        assert_eq!(to_params(Vec::new()), Params::Empty);
        assert_eq!(
            to_params(vec![SqlValue::Int(1)]),
            Params::Positional(vec![Value::Int(1)])
        );
    }

    #[test]
    fn test_from_mysql_value_text_and_bytes() {
        assert_eq!(
            from_mysql_value(Value::Bytes(b"20240101000000".to_vec())),
            SqlValue::from("20240101000000")
        );
        assert_eq!(
            from_mysql_value(Value::Bytes(vec![0xff, 0xfe])),
            SqlValue::Bytes(vec![0xff, 0xfe])
        );
    }

    #[test]
    fn test_from_mysql_value_numbers() {
        assert_eq!(from_mysql_value(Value::Int(5)), SqlValue::Int(5));
        assert_eq!(from_mysql_value(Value::UInt(5)), SqlValue::UInt(5));
        assert_eq!(from_mysql_value(Value::Double(1.25)), SqlValue::Float(1.25));
    }

    #[test]
    fn test_from_mysql_value_temporal() {
        assert_eq!(
            from_mysql_value(Value::Date(2024, 1, 2, 3, 4, 5, 0)),
            SqlValue::from("2024-01-02 03:04:05")
        );
        assert_eq!(
            from_mysql_value(Value::Date(2024, 1, 2, 3, 4, 5, 120)),
            SqlValue::from("2024-01-02 03:04:05.000120")
        );
        assert_eq!(
            from_mysql_value(Value::Time(true, 1, 2, 3, 4, 0)),
            SqlValue::from("-26:03:04")
        );
    }
}
