//! SQLite connection implementing the engine's [`Database`] trait.

use async_trait::async_trait;
use tidemark_migrate::{Database, Dialect, MigrateResult, QueryRows, SqlValue};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::types::{get_value_at_index, to_sqlite_value};

/// A single SQLite connection held for the lifetime of a command.
pub struct SqliteDatabase {
    conn: Connection,
    config: SqliteConfig,
}

impl SqliteDatabase {
    /// Open a connection with the given configuration.
    pub async fn connect(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            crate::DatabasePath::Memory => Connection::open_in_memory().await,
            crate::DatabasePath::File(path) => Connection::open(path).await,
        }
        .map_err(|e| {
            SqliteError::connection(format!("unable to open {}: {}", config.path.display(), e))
        })?;

        let init_sql = config.init_sql();
        conn.call(move |conn| {
            conn.execute_batch(&init_sql)?;
            Ok(())
        })
        .await?;

        debug!(path = %config.path.display(), "Opened SQLite database");
        Ok(Self { conn, config })
    }

    /// Open a database from a `sqlite://` URL.
    pub async fn from_url(url: &str) -> SqliteResult<Self> {
        Self::connect(SqliteConfig::from_url(url)?).await
    }

    /// Open a file-based database.
    pub async fn open(path: impl AsRef<std::path::Path>) -> SqliteResult<Self> {
        Self::connect(SqliteConfig::file(path)).await
    }

    /// Open a fresh in-memory database.
    pub async fn open_in_memory() -> SqliteResult<Self> {
        Self::connect(SqliteConfig::memory()).await
    }

    /// The configuration used to open this connection.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Close the connection.
    pub async fn close(self) -> SqliteResult<()> {
        self.conn.close().await.map_err(SqliteError::from)
    }

    async fn run_query(&self, sql: &str, params: Vec<SqlValue>) -> SqliteResult<QueryRows> {
        let sql = sql.to_string();
        let params: Vec<rusqlite::types::Value> = params.into_iter().map(to_sqlite_value).collect();
        debug!(sql = %sql, params = params.len(), "Executing query");

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt
                    .column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                let width = columns.len();

                let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
                    Ok((0..width)
                        .map(|i| get_value_at_index(row, i))
                        .collect::<Vec<_>>())
                })?;

                let rows: Result<Vec<Vec<SqlValue>>, _> = rows.collect();
                Ok(QueryRows {
                    columns,
                    rows: rows?,
                })
            })
            .await
            .map_err(SqliteError::from)
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute_script(&self, sql: &str) -> MigrateResult<()> {
        let sql = sql.to_string();
        debug!(bytes = sql.len(), "Executing script");

        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(SqliteError::from)?;
        Ok(())
    }

    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<u64> {
        let sql = sql.to_string();
        let params: Vec<rusqlite::types::Value> = params.into_iter().map(to_sqlite_value).collect();
        debug!(sql = %sql, params = params.len(), "Executing statement");

        let affected = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                Ok(stmt.execute(rusqlite::params_from_iter(params))?)
            })
            .await
            .map_err(SqliteError::from)?;
        Ok(affected as u64)
    }

    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<QueryRows> {
        Ok(self.run_query(sql, params).await?)
    }

    async fn list_tables(&self) -> MigrateResult<Vec<String>> {
        let rows = self
            .run_query(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
                Vec::new(),
            )
            .await?;
        Ok(rows.first_column_text())
    }

    async fn table_definition(&self, table: &str) -> MigrateResult<Option<String>> {
        let rows = self
            .run_query(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
                vec![SqlValue::from(table)],
            )
            .await?;
        Ok(rows.first_column_text().into_iter().next())
    }
}
