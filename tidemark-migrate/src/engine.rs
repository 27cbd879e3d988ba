//! Migration runner: moves the database between catalog versions.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CreatedMigration, Direction, MigrationCatalog, MigrationScript};
use crate::database::Database;
use crate::error::{MigrateResult, MigrationError};
use crate::history::{DEFAULT_TABLE, MigrationLock, VersionStore, default_lock_owner};
use crate::version::Version;

/// Configuration for the migration runner.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Path to the migrations directory.
    pub migrations_dir: PathBuf,
    /// Name of the tracking table.
    pub table_name: String,
    /// Whether mutating operations take the advisory lock.
    pub lock: bool,
    /// Owner recorded in the lock row. Defaults to `host:pid`.
    pub lock_owner: Option<String>,
    /// Whether each script runs in its own transaction when the dialect allows it.
    pub transactional: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("./db/migrations"),
            table_name: DEFAULT_TABLE.to_string(),
            lock: false,
            lock_owner: None,
            transactional: true,
        }
    }
}

impl MigratorConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migrations directory.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Set the tracking table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Enable or disable the advisory lock.
    pub fn lock(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }

    /// Set the owner recorded in the lock row.
    pub fn lock_owner(mut self, owner: impl Into<String>) -> Self {
        self.lock_owner = Some(owner.into());
        self
    }

    /// Enable or disable per-script transactions.
    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }
}

/// One executed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Version the script belongs to.
    pub version: Version,
    /// File name of the script.
    pub file_name: String,
    /// Execution time in milliseconds.
    pub duration_ms: i64,
}

/// Result of an `up`, `down`, or directional `goto`.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Direction of the run.
    pub direction: Direction,
    /// Executed scripts, in execution order.
    pub steps: Vec<StepOutcome>,
    /// Current version after the run.
    pub current: Option<Version>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl RunReport {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            steps: Vec::new(),
            current: None,
            duration_ms: 0,
        }
    }

    /// Number of executed scripts.
    pub fn count(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing was executed.
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    /// Executed versions, in execution order.
    pub fn versions(&self) -> Vec<&Version> {
        self.steps.iter().map(|s| &s.version).collect()
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        match (self.direction, self.steps.len()) {
            (Direction::Up, 0) => "No pending migrations".to_string(),
            (Direction::Down, 0) => "Nothing to roll back".to_string(),
            (Direction::Up, n) => format!("Applied {} migration(s) in {}ms", n, self.duration_ms),
            (Direction::Down, n) => {
                format!("Rolled back {} migration(s) in {}ms", n, self.duration_ms)
            }
        }
    }
}

/// Result of a `goto`.
#[derive(Debug, Clone)]
pub enum GotoOutcome {
    /// The database was already at the target.
    AlreadyAtTarget(Version),
    /// Migrated forward to the target.
    Forward {
        /// Version before the run.
        from: Option<Version>,
        /// Run details.
        report: RunReport,
    },
    /// Rolled back to the target.
    Backward {
        /// Version before the run.
        from: Option<Version>,
        /// Run details.
        report: RunReport,
    },
}

impl GotoOutcome {
    /// The run report, unless nothing had to be done.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::AlreadyAtTarget(_) => None,
            Self::Forward { report, .. } | Self::Backward { report, .. } => Some(report),
        }
    }
}

/// An applied version in the status history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Applied version.
    pub version: Version,
    /// Description from the matching file, if any.
    pub description: Option<String>,
    /// When it was applied.
    pub applied_at: Option<String>,
    /// Whether this is the current version.
    pub is_current: bool,
}

/// A catalog version with its applied flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Catalog version.
    pub version: Version,
    /// Description from the file name.
    pub description: Option<String>,
    /// Whether it has been applied.
    pub applied: bool,
}

/// Migration status information.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Current version, `None` when unmigrated.
    pub current: Option<Version>,
    /// Applied versions, most recent first.
    pub history: Vec<HistoryEntry>,
    /// Every catalog version, ascending.
    pub catalog: Vec<CatalogEntry>,
}

impl StatusReport {
    /// Catalog versions not yet applied.
    pub fn pending(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.catalog.iter().filter(|e| !e.applied)
    }
}

/// The migration runner.
pub struct Migrator<D: Database> {
    config: MigratorConfig,
    db: D,
    catalog: MigrationCatalog,
}

impl<D: Database> Migrator<D> {
    /// Create a new runner.
    pub fn new(config: MigratorConfig, db: D) -> Self {
        let catalog = MigrationCatalog::new(&config.migrations_dir);
        Self {
            config,
            db,
            catalog,
        }
    }

    /// The runner configuration.
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// The underlying database.
    pub fn database(&self) -> &D {
        &self.db
    }

    /// The migration catalog.
    pub fn catalog(&self) -> &MigrationCatalog {
        &self.catalog
    }

    /// The version store over the configured tracking table.
    pub fn store(&self) -> VersionStore<'_, D> {
        VersionStore::new(&self.db, &self.config.table_name)
    }

    /// Create the tracking table if needed.
    pub async fn initialize(&self) -> MigrateResult<()> {
        self.store().ensure_schema().await
    }

    /// Write a new migration pair.
    pub async fn create(&self, name: &str) -> MigrateResult<CreatedMigration> {
        self.catalog.create(name).await
    }

    /// Apply pending migrations in ascending order. `steps == 0` applies all.
    pub async fn up(&self, steps: usize) -> MigrateResult<RunReport> {
        let catalog = self.catalog.load().await?;
        self.initialize().await?;

        let lock = self.acquire_lock().await?;
        let result = self.run_up(&catalog, steps, None).await;
        self.finish(lock, result).await
    }

    /// Roll back the `steps` most recent migrations. Clamped to the applied count.
    pub async fn down(&self, steps: usize) -> MigrateResult<RunReport> {
        let catalog = self.catalog.load().await?;
        self.initialize().await?;

        let lock = self.acquire_lock().await?;
        let result = self.run_down(&catalog, Some(steps), None).await;
        self.finish(lock, result).await
    }

    /// Move the database to exactly `target`, picking the direction.
    pub async fn goto(&self, target: &str) -> MigrateResult<GotoOutcome> {
        let catalog = self.catalog.load().await?;
        let target = Version::parse(target)
            .ok()
            .filter(|v| catalog.contains(v))
            .ok_or_else(|| MigrationError::UnknownVersion(target.to_string()))?;

        self.initialize().await?;
        let lock = self.acquire_lock().await?;
        let result = self.run_goto(&catalog, target).await;
        self.finish(lock, result).await
    }

    /// Current version, applied history and catalog state.
    pub async fn status(&self) -> MigrateResult<StatusReport> {
        let catalog = self.catalog.load().await?;
        self.initialize().await?;

        let applied = self.store().list_applied().await?;
        let applied_set: HashSet<&Version> = applied.iter().map(|r| &r.version).collect();
        let current = applied.first().map(|r| r.version.clone());

        let history = applied
            .iter()
            .enumerate()
            .map(|(i, record)| HistoryEntry {
                version: record.version.clone(),
                description: catalog.description_of(&record.version).map(String::from),
                applied_at: record.applied_at.clone(),
                is_current: i == 0,
            })
            .collect();

        let entries = catalog
            .versions()
            .into_iter()
            .map(|version| CatalogEntry {
                description: catalog.description_of(&version).map(String::from),
                applied: applied_set.contains(&version),
                version,
            })
            .collect();

        Ok(StatusReport {
            current,
            history,
            catalog: entries,
        })
    }

    /// Remove a stale advisory lock. Returns whether one was present.
    pub async fn unlock(&self) -> MigrateResult<bool> {
        MigrationLock::force_release(&self.db, &self.config.table_name).await
    }

    async fn run_goto(&self, catalog: &Catalog, target: Version) -> MigrateResult<GotoOutcome> {
        let current = self.store().current_version().await?;
        info!(
            from = current.as_ref().map(Version::as_str).unwrap_or("none"),
            to = %target,
            "Migrating to target version"
        );

        match current.as_ref() {
            Some(cur) if *cur == target => Ok(GotoOutcome::AlreadyAtTarget(target)),
            Some(cur) if *cur > target => {
                let report = self.run_down(catalog, None, Some(&target)).await?;
                Ok(GotoOutcome::Backward {
                    from: current,
                    report,
                })
            }
            _ => {
                let report = self.run_up(catalog, 0, Some(&target)).await?;
                Ok(GotoOutcome::Forward {
                    from: current,
                    report,
                })
            }
        }
    }

    /// Apply un-applied up scripts, optionally bounded by count and a ceiling version.
    async fn run_up(
        &self,
        catalog: &Catalog,
        steps: usize,
        ceiling: Option<&Version>,
    ) -> MigrateResult<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new(Direction::Up);

        let applied: HashSet<Version> = self
            .store()
            .list_applied()
            .await?
            .into_iter()
            .map(|r| r.version)
            .collect();

        for version in catalog.versions() {
            if applied.contains(&version) {
                continue;
            }
            if ceiling.is_some_and(|c| version > *c) {
                break;
            }
            // A version with only a down script has nothing to apply
            let Some(script) = catalog.find(&version, Direction::Up)? else {
                continue;
            };

            let outcome = self.apply(script).await?;
            report.steps.push(outcome);

            if steps > 0 && report.steps.len() >= steps {
                break;
            }
            if ceiling == Some(&version) {
                break;
            }
        }

        report.current = self.store().current_version().await?;
        report.duration_ms = start.elapsed().as_millis() as i64;
        Ok(report)
    }

    /// Roll back applied versions, newest first, bounded by count and/or a floor version.
    async fn run_down(
        &self,
        catalog: &Catalog,
        steps: Option<usize>,
        floor: Option<&Version>,
    ) -> MigrateResult<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new(Direction::Down);

        let applied = self.store().list_applied().await?;
        let limit = steps.map_or(applied.len(), |s| s.min(applied.len()));

        for record in applied.iter().take(limit) {
            if floor.is_some_and(|f| record.version <= *f) {
                break;
            }

            let script = catalog
                .find(&record.version, Direction::Down)?
                .ok_or_else(|| MigrationError::MissingRollbackFile(record.version.to_string()))?;

            let outcome = self.rollback(script).await?;
            report.steps.push(outcome);
        }

        report.current = self.store().current_version().await?;
        report.duration_ms = start.elapsed().as_millis() as i64;
        Ok(report)
    }

    async fn apply(&self, script: &MigrationScript) -> MigrateResult<StepOutcome> {
        let sql = script.read_sql().await?;
        let started = Instant::now();

        self.in_unit(script, &sql, async {
            self.db
                .execute_script(&sql)
                .await
                .map_err(|e| execution_error(script, e))?;
            self.store().record_applied(&script.version).await
        })
        .await?;

        let duration_ms = started.elapsed().as_millis() as i64;
        info!(version = %script.version, file = %script.file_name, duration_ms, "Applied migration");
        Ok(StepOutcome {
            version: script.version.clone(),
            file_name: script.file_name.clone(),
            duration_ms,
        })
    }

    async fn rollback(&self, script: &MigrationScript) -> MigrateResult<StepOutcome> {
        let sql = script.read_sql().await?;
        let started = Instant::now();

        self.in_unit(script, &sql, async {
            self.db
                .execute_script(&sql)
                .await
                .map_err(|e| execution_error(script, e))?;
            self.store().remove_applied(&script.version).await
        })
        .await?;

        let duration_ms = started.elapsed().as_millis() as i64;
        info!(version = %script.version, file = %script.file_name, duration_ms, "Rolled back migration");
        Ok(StepOutcome {
            version: script.version.clone(),
            file_name: script.file_name.clone(),
            duration_ms,
        })
    }

    /// Run one script and its bookkeeping as a unit.
    ///
    /// Wrapped in a transaction only where the dialect can roll back DDL and
    /// the script does not open or commit one itself.
    async fn in_unit<F>(&self, script: &MigrationScript, sql: &str, work: F) -> MigrateResult<()>
    where
        F: std::future::Future<Output = MigrateResult<()>>,
    {
        let transactional = self.config.transactional && self.db.dialect().transactional_ddl();
        if !transactional {
            return work.await;
        }
        if manages_transaction(sql) {
            debug!(file = %script.file_name, "Script controls its own transaction");
            return work.await;
        }

        self.db.execute_script("BEGIN").await?;
        match work.await {
            Ok(()) => self.db.execute_script("COMMIT").await,
            Err(e) => {
                if let Err(rollback_err) = self.db.execute_script("ROLLBACK").await {
                    warn!(file = %script.file_name, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn acquire_lock(&self) -> MigrateResult<Option<MigrationLock>> {
        if !self.config.lock {
            return Ok(None);
        }
        let owner = self
            .config
            .lock_owner
            .clone()
            .unwrap_or_else(default_lock_owner);
        MigrationLock::acquire(&self.db, &self.config.table_name, owner)
            .await
            .map(Some)
    }

    /// Release the lock whatever the outcome; the operation's error wins.
    async fn finish<T>(
        &self,
        lock: Option<MigrationLock>,
        result: MigrateResult<T>,
    ) -> MigrateResult<T> {
        let Some(lock) = lock else {
            return result;
        };

        match (result, lock.release(&self.db).await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                warn!(error = %release_err, "Failed to release migration lock");
                Err(e)
            }
        }
    }
}

/// Whether any statement in `sql` begins or commits a transaction.
///
/// `END` on its own is not counted since trigger bodies close with it.
fn manages_transaction(sql: &str) -> bool {
    let code: String = sql
        .lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");

    code.split(';').any(|statement| {
        let mut words = statement.split_whitespace();
        match words.next().map(str::to_ascii_uppercase).as_deref() {
            Some("BEGIN" | "COMMIT" | "SAVEPOINT" | "RELEASE") => true,
            Some("END") => words
                .next()
                .is_some_and(|w| w.eq_ignore_ascii_case("TRANSACTION")),
            _ => false,
        }
    })
}

fn execution_error(script: &MigrationScript, err: MigrationError) -> MigrationError {
    let message = match err {
        MigrationError::Database(msg) => msg,
        other => other.to_string(),
    };
    warn!(file = %script.file_name, error = %message, "Migration script failed");
    MigrationError::execution(&script.file_name, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MigratorConfig::default();
        assert_eq!(config.migrations_dir, PathBuf::from("./db/migrations"));
        assert_eq!(config.table_name, "schema_migrations");
        assert!(!config.lock);
        assert!(config.transactional);
    }

    #[test]
    fn test_config_builder() {
        let config = MigratorConfig::new()
            .migrations_dir("./custom")
            .table_name("_versions")
            .lock(true)
            .lock_owner("ci")
            .transactional(false);

        assert_eq!(config.migrations_dir, PathBuf::from("./custom"));
        assert_eq!(config.table_name, "_versions");
        assert!(config.lock);
        assert_eq!(config.lock_owner.as_deref(), Some("ci"));
        assert!(!config.transactional);
    }

    fn step(version: &str) -> StepOutcome {
        StepOutcome {
            version: Version::parse(version).unwrap(),
            file_name: format!("{}_x.up.sql", version),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_run_report_summary() {
        let mut report = RunReport::new(Direction::Up);
        assert!(report.is_noop());
        assert_eq!(report.summary(), "No pending migrations");

        report.steps.push(step("20240101000000"));
        report.steps.push(step("20240102000000"));
        report.duration_ms = 12;
        assert_eq!(report.count(), 2);
        assert_eq!(report.summary(), "Applied 2 migration(s) in 12ms");

        let down = RunReport::new(Direction::Down);
        assert_eq!(down.summary(), "Nothing to roll back");
    }

    #[test]
    fn test_manages_transaction() {
        assert!(manages_transaction(
            "BEGIN TRANSACTION;\nCREATE TABLE t (id INTEGER);\nCOMMIT;"
        ));
        assert!(manages_transaction("-- rebuild\nbegin;\nDROP TABLE t;\nend transaction;"));
        assert!(!manages_transaction("CREATE TABLE t (id INTEGER);"));
        assert!(!manages_transaction("-- BEGIN later\nCREATE TABLE t (id INTEGER);"));
        assert!(!manages_transaction(
            "CREATE TRIGGER trg AFTER INSERT ON t BEGIN\n  INSERT INTO log VALUES (1);\nEND;"
        ));
    }

    #[test]
    fn test_goto_outcome_report() {
        let v = Version::parse("20240101000000").unwrap();
        assert!(GotoOutcome::AlreadyAtTarget(v).report().is_none());

        let outcome = GotoOutcome::Forward {
            from: None,
            report: RunReport::new(Direction::Up),
        };
        assert!(outcome.report().is_some());
    }
}
