//! The SQL execution capability consumed by the engine.
//!
//! Drivers (`tidemark-mysql`, `tidemark-sqlite`) implement [`Database`];
//! the engine never talks to a client library directly.

use std::fmt;

use crate::error::MigrateResult;

/// SQL dialect of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// MySQL / MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// Quote an identifier for this dialect.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", ident.replace('`', "``")),
            Self::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Whether DDL can be rolled back inside a transaction.
    pub fn transactional_ddl(&self) -> bool {
        matches!(self, Self::Sqlite)
    }

    /// DDL for the tracking table.
    pub fn tracking_table_sql(&self, table: &str) -> String {
        let table = self.quote_ident(table);
        match self {
            Self::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    \
                 version VARCHAR(255) NOT NULL,\n    \
                 applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,\n    \
                 PRIMARY KEY (version)\n\
                 ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
            ),
            Self::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    \
                 version TEXT NOT NULL PRIMARY KEY,\n    \
                 applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
                 )"
            ),
        }
    }

    /// DDL for the advisory lock table.
    pub fn lock_table_sql(&self, table: &str) -> String {
        let table = self.quote_ident(table);
        match self {
            Self::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    \
                 id INT NOT NULL PRIMARY KEY,\n    \
                 owner VARCHAR(255) NOT NULL,\n    \
                 locked_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
                 ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
            ),
            Self::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    \
                 id INTEGER NOT NULL PRIMARY KEY,\n    \
                 owner TEXT NOT NULL,\n    \
                 locked_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
                 )"
            ),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MySql => write!(f, "mysql"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// A single value read from or bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Render the value as a SQL literal.
    ///
    /// Strings and bytes are single-quoted with embedded quotes doubled.
    /// Infinities use an overflowing literal and NaN becomes `NULL`.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) if f.is_nan() => "NULL".to_string(),
            Self::Float(f) if f.is_infinite() => {
                if f.is_sign_positive() { "9e999" } else { "-9e999" }.to_string()
            }
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Bytes(b) => format!("'{}'", String::from_utf8_lossy(b).replace('\'', "''")),
        }
    }

    /// Render the value as a CSV field. NULL becomes an empty field.
    pub fn to_csv_field(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Rows returned by a query, with their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    /// Column names, in select order.
    pub columns: Vec<String>,
    /// Row values, positionally matching `columns`.
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryRows {
    /// Whether no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Text values of the first column, skipping non-text cells.
    pub fn first_column_text(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .filter_map(|value| match value {
                SqlValue::Text(s) => Some(s.clone()),
                SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
                _ => None,
            })
            .collect()
    }
}

/// SQL execution capability.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Dialect of the backend.
    fn dialect(&self) -> Dialect;

    /// Execute a multi-statement script verbatim.
    async fn execute_script(&self, sql: &str) -> MigrateResult<()>;

    /// Execute one parameterized statement, returning affected rows.
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<u64>;

    /// Run a parameterized query.
    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<QueryRows>;

    /// User tables, sorted by name.
    async fn list_tables(&self) -> MigrateResult<Vec<String>>;

    /// The `CREATE TABLE` statement for a table, if the backend exposes it.
    async fn table_definition(&self, table: &str) -> MigrateResult<Option<String>>;
}

#[async_trait::async_trait]
impl<T: Database + ?Sized> Database for Box<T> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    async fn execute_script(&self, sql: &str) -> MigrateResult<()> {
        (**self).execute_script(sql).await
    }

    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<u64> {
        (**self).execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<QueryRows> {
        (**self).query(sql, params).await
    }

    async fn list_tables(&self) -> MigrateResult<Vec<String>> {
        (**self).list_tables().await
    }

    async fn table_definition(&self, table: &str) -> MigrateResult<Option<String>> {
        (**self).table_definition(table).await
    }
}
