//! MySQL connection implementing the engine's [`Database`] trait.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Row};
use tidemark_migrate::{Database, Dialect, MigrateResult, QueryRows, SqlValue};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::MysqlConfig;
use crate::error::{MysqlError, MysqlResult};
use crate::types::{row_values, to_params};

/// A single MySQL connection held for the lifetime of a command.
pub struct MysqlDatabase {
    conn: Mutex<Conn>,
    config: MysqlConfig,
}

impl MysqlDatabase {
    /// Open a connection with the given configuration.
    pub async fn connect(config: MysqlConfig) -> MysqlResult<Self> {
        let conn = Conn::new(config.to_opts_builder()).await.map_err(|e| {
            MysqlError::connection(format!("unable to connect to {}: {}", config.redacted(), e))
        })?;

        debug!(target = %config.redacted(), "Connected to MySQL");
        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    /// Open a connection from a `mysql://` URL.
    pub async fn from_url(url: &str) -> MysqlResult<Self> {
        Self::connect(MysqlConfig::from_url(url)?).await
    }

    /// The configuration used to open this connection.
    pub fn config(&self) -> &MysqlConfig {
        &self.config
    }

    /// Close the connection.
    pub async fn disconnect(self) -> MysqlResult<()> {
        self.conn.into_inner().disconnect().await?;
        Ok(())
    }

    async fn run_query(&self, sql: &str, params: Vec<SqlValue>) -> MysqlResult<QueryRows> {
        debug!(sql = %sql, params = params.len(), "Executing query");
        let mut conn = self.conn.lock().await;

        let mut result = conn.exec_iter(sql, to_params(params)).await?;
        let columns: Vec<String> = result
            .columns_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();
        let rows: Vec<Row> = result.collect_and_drop().await?;

        Ok(QueryRows {
            columns,
            rows: rows.iter().map(row_values).collect(),
        })
    }
}

#[async_trait]
impl Database for MysqlDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn execute_script(&self, sql: &str) -> MigrateResult<()> {
        if sql.trim().is_empty() {
            return Ok(());
        }
        debug!(bytes = sql.len(), "Executing script");

        let mut conn = self.conn.lock().await;
        conn.query_drop(sql).await.map_err(MysqlError::from)?;
        Ok(())
    }

    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<u64> {
        debug!(sql = %sql, params = params.len(), "Executing statement");

        let mut conn = self.conn.lock().await;
        conn.exec_drop(sql, to_params(params))
            .await
            .map_err(MysqlError::from)?;
        Ok(conn.affected_rows())
    }

    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<QueryRows> {
        Ok(self.run_query(sql, params).await?)
    }

    async fn list_tables(&self) -> MigrateResult<Vec<String>> {
        let mut tables = self.run_query("SHOW TABLES", Vec::new()).await?.first_column_text();
        tables.sort();
        Ok(tables)
    }

    async fn table_definition(&self, table: &str) -> MigrateResult<Option<String>> {
        let sql = format!("SHOW CREATE TABLE {}", Dialect::MySql.quote_ident(table));
        let rows = self.run_query(&sql, Vec::new()).await?;

        // Columns are (Table, Create Table)
        Ok(rows
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().nth(1))
            .and_then(|value| match value {
                SqlValue::Text(s) => Some(s),
                SqlValue::Bytes(b) => Some(String::from_utf8_lossy(&b).into_owned()),
                _ => None,
            }))
    }
}
