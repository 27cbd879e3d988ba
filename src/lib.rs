//! # Tidemark
//!
//! Versioned SQL migrations for MySQL and SQLite.
//!
//! Tidemark provides:
//! - Timestamped `up`/`down` script pairs kept in a plain directory
//! - A tracking table recording which versions are applied
//! - Forward, backward, and exact-version moves
//! - SQL and CSV import/export of table data
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidemark::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = tidemark::sqlite::SqliteDatabase::open("app.db").await?;
//!     let migrator = Migrator::new(MigratorConfig::new().migrations_dir("db/migrations"), db);
//!
//!     let report = migrator.up(0).await?;
//!     println!("{}", report.summary());
//!
//!     let status = migrator.status().await?;
//!     println!("current: {:?}", status.current);
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Migration engine: catalog, version store, runner, and data mover.
pub mod migrate {
    pub use tidemark_migrate::*;
}

/// SQLite driver.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use tidemark_sqlite::*;
}

/// MySQL driver.
#[cfg(feature = "mysql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
pub mod mysql {
    pub use tidemark_mysql::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        Database, DataMover, ExportFormat, GotoOutcome, MigrateResult, MigrationError, Migrator,
        MigratorConfig, RunReport, StatusReport, Version,
    };
}

// Re-export key types at the crate root
pub use migrate::{MigrationError, Migrator, MigratorConfig, Version};
