//! # tidemark-migrate
//!
//! Migration engine for Tidemark.
//!
//! This crate provides functionality for:
//! - Discovering `{version}_{description}.{up|down}.sql` pairs on disk
//! - Tracking applied versions in a `schema_migrations` table
//! - Moving the database forward, backward, or to an exact version
//! - An optional advisory lock against concurrent runs
//! - Bulk import and export of table data (SQL and CSV)
//!
//! ## Architecture
//!
//! The engine never talks to a client library directly. Drivers implement
//! the [`Database`] trait and the runner drives them through it.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌───────────────┐
//! │ Migrations   │────▶│ Catalog        │────▶│ Migrator      │
//! │ directory    │     │ (scan, order)  │     │ (up/down/goto)│
//! └──────────────┘     └────────────────┘     └───────────────┘
//!                                                    │
//!                              ┌─────────────────────┤
//!                              ▼                     ▼
//!                      ┌────────────────┐     ┌─────────────┐
//!                      │ Version Store  │◀───▶│ Database    │
//!                      │ (tracking tbl) │     │ (driver)    │
//!                      └────────────────┘     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tidemark_migrate::{Migrator, MigratorConfig};
//! use tidemark_sqlite::SqliteDatabase;
//!
//! async fn run_migrations() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = SqliteDatabase::open("app.db").await?;
//!
//!     let config = MigratorConfig::new()
//!         .migrations_dir("./db/migrations");
//!     let migrator = Migrator::new(config, db);
//!
//!     // Apply everything pending
//!     let report = migrator.up(0).await?;
//!     println!("{}", report.summary());
//!
//!     // Jump back to a known version
//!     migrator.goto("20240101000000").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Migration Files
//!
//! Each version is a pair of files. Sub-directories are scanned but carry no
//! meaning:
//!
//! ```text
//! db/migrations/
//! ├── 20240101000000_create_users.up.sql
//! ├── 20240101000000_create_users.down.sql
//! ├── 20240102000000_add_posts.up.sql
//! └── 20240102000000_add_posts.down.sql
//! ```

pub mod catalog;
pub mod database;
pub mod engine;
pub mod error;
pub mod history;
pub mod transfer;
pub mod version;

// Re-exports
pub use catalog::{Catalog, CreatedMigration, Direction, MigrationCatalog, MigrationScript};
pub use database::{Database, Dialect, QueryRows, SqlValue};
pub use engine::{
    CatalogEntry, GotoOutcome, HistoryEntry, Migrator, MigratorConfig, RunReport, StatusReport,
    StepOutcome,
};
pub use error::{MigrateResult, MigrationError};
pub use history::{AppliedMigration, DEFAULT_TABLE, MigrationLock, VersionStore, default_lock_owner};
pub use transfer::{DataMover, ExportFormat, ExportSummary, ImportSummary};
pub use version::Version;
