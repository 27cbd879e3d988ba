//! Version store: the tracking table of applied migrations.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::{Database, SqlValue};
use crate::error::{MigrateResult, MigrationError};
use crate::version::Version;

/// Default tracking table name.
pub const DEFAULT_TABLE: &str = "schema_migrations";

/// A record of an applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    /// Applied version.
    pub version: Version,
    /// When the version was applied, as reported by the database.
    pub applied_at: Option<String>,
}

/// Persists applied versions in a tracking table.
pub struct VersionStore<'a, D: Database + ?Sized> {
    db: &'a D,
    table: &'a str,
}

impl<'a, D: Database + ?Sized> VersionStore<'a, D> {
    /// Create a store over `table`.
    pub fn new(db: &'a D, table: &'a str) -> Self {
        Self { db, table }
    }

    /// Name of the tracking table.
    pub fn table(&self) -> &str {
        self.table
    }

    fn quoted_table(&self) -> String {
        self.db.dialect().quote_ident(self.table)
    }

    /// Create the tracking table if it does not exist.
    pub async fn ensure_schema(&self) -> MigrateResult<()> {
        let ddl = self.db.dialect().tracking_table_sql(self.table);
        self.db.execute_script(&ddl).await
    }

    /// Whether `version` has a record.
    pub async fn is_applied(&self, version: &Version) -> MigrateResult<bool> {
        let sql = format!("SELECT version FROM {} WHERE version = ?", self.quoted_table());
        let rows = self
            .db
            .query(&sql, vec![SqlValue::from(version.as_str())])
            .await?;
        Ok(!rows.is_empty())
    }

    /// Record `version` as applied.
    pub async fn record_applied(&self, version: &Version) -> MigrateResult<()> {
        if self.is_applied(version).await? {
            return Err(MigrationError::DuplicateVersion(version.to_string()));
        }

        let sql = format!("INSERT INTO {} (version) VALUES (?)", self.quoted_table());
        self.db
            .execute(&sql, vec![SqlValue::from(version.as_str())])
            .await?;

        debug!(version = %version, "Recorded applied version");
        Ok(())
    }

    /// Delete the record for `version`. Absent records are not an error.
    pub async fn remove_applied(&self, version: &Version) -> MigrateResult<()> {
        let sql = format!("DELETE FROM {} WHERE version = ?", self.quoted_table());
        self.db
            .execute(&sql, vec![SqlValue::from(version.as_str())])
            .await?;

        debug!(version = %version, "Removed applied version");
        Ok(())
    }

    /// Applied versions, most recent first.
    pub async fn list_applied(&self) -> MigrateResult<Vec<AppliedMigration>> {
        let sql = format!(
            "SELECT version, applied_at FROM {} ORDER BY version DESC",
            self.quoted_table()
        );
        let rows = self.db.query(&sql, Vec::new()).await?;

        let mut applied = Vec::with_capacity(rows.rows.len());
        for row in rows.rows {
            let mut cells = row.into_iter();
            let version = match cells.next() {
                Some(SqlValue::Text(s)) => s,
                Some(SqlValue::Bytes(b)) => String::from_utf8_lossy(&b).into_owned(),
                other => {
                    return Err(MigrationError::database(format!(
                        "unexpected version value in {}: {:?}",
                        self.table, other
                    )));
                }
            };
            let applied_at = match cells.next() {
                Some(SqlValue::Null) | None => None,
                Some(value) => Some(value.to_csv_field()),
            };
            applied.push(AppliedMigration {
                version: Version::parse(&version)?,
                applied_at,
            });
        }

        Ok(applied)
    }

    /// The greatest applied version, or `None` when unmigrated.
    pub async fn current_version(&self) -> MigrateResult<Option<Version>> {
        Ok(self.list_applied().await?.into_iter().next().map(|r| r.version))
    }
}

/// Proof of holding the advisory migration lock.
///
/// Returned by [`MigrationLock::acquire`] and consumed by
/// [`MigrationLock::release`].
#[derive(Debug)]
#[must_use = "the lock row stays in place until released"]
pub struct MigrationLock {
    table: String,
    owner: String,
}

/// Row id used for the single lock row.
const LOCK_ROW_ID: i64 = 1;

impl MigrationLock {
    /// Name of the lock table belonging to a tracking table.
    pub fn table_for(tracking_table: &str) -> String {
        format!("{}_lock", tracking_table)
    }

    /// Owner string recorded in the lock row.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Insert the lock row, failing with [`MigrationError::LockHeld`] if one exists.
    pub async fn acquire<D: Database + ?Sized>(
        db: &D,
        tracking_table: &str,
        owner: impl Into<String>,
    ) -> MigrateResult<Self> {
        let table = Self::table_for(tracking_table);
        let dialect = db.dialect();
        db.execute_script(&dialect.lock_table_sql(&table)).await?;

        if let Some((owner, locked_at)) = Self::holder(db, &table).await? {
            return Err(MigrationError::LockHeld { owner, locked_at });
        }

        let owner = owner.into();
        let sql = format!(
            "INSERT INTO {} (id, owner) VALUES (?, ?)",
            dialect.quote_ident(&table)
        );
        if let Err(e) = db
            .execute(&sql, vec![SqlValue::Int(LOCK_ROW_ID), SqlValue::from(owner.as_str())])
            .await
        {
            // Lost a race with another process between the check and the insert.
            if let Some((owner, locked_at)) = Self::holder(db, &table).await? {
                return Err(MigrationError::LockHeld { owner, locked_at });
            }
            return Err(e);
        }

        debug!(table = %table, owner = %owner, "Acquired migration lock");
        Ok(Self { table, owner })
    }

    /// Remove the lock row.
    pub async fn release<D: Database + ?Sized>(self, db: &D) -> MigrateResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE id = ? AND owner = ?",
            db.dialect().quote_ident(&self.table)
        );
        db.execute(&sql, vec![SqlValue::Int(LOCK_ROW_ID), SqlValue::from(self.owner.as_str())])
            .await?;

        debug!(table = %self.table, "Released migration lock");
        Ok(())
    }

    /// Remove any lock row regardless of owner. Returns whether one existed.
    pub async fn force_release<D: Database + ?Sized>(
        db: &D,
        tracking_table: &str,
    ) -> MigrateResult<bool> {
        let table = Self::table_for(tracking_table);
        let dialect = db.dialect();
        db.execute_script(&dialect.lock_table_sql(&table)).await?;

        let existed = Self::holder(db, &table).await?.is_some();
        let sql = format!("DELETE FROM {} WHERE id = ?", dialect.quote_ident(&table));
        db.execute(&sql, vec![SqlValue::Int(LOCK_ROW_ID)]).await?;
        Ok(existed)
    }

    async fn holder<D: Database + ?Sized>(
        db: &D,
        table: &str,
    ) -> MigrateResult<Option<(String, String)>> {
        let sql = format!(
            "SELECT owner, locked_at FROM {} WHERE id = ?",
            db.dialect().quote_ident(table)
        );
        let rows = db.query(&sql, vec![SqlValue::Int(LOCK_ROW_ID)]).await?;
        Ok(rows.rows.into_iter().next().map(|row| {
            let owner = row.first().map(SqlValue::to_csv_field).unwrap_or_default();
            let locked_at = row.get(1).map(SqlValue::to_csv_field).unwrap_or_default();
            (owner, locked_at)
        }))
    }
}

/// Owner string for the current process (`host:pid`).
pub fn default_lock_owner() -> String {
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{}:{}", host, std::process::id())
}
