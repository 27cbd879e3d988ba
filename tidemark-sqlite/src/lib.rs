//! SQLite database driver for Tidemark.
//!
//! This crate provides SQLite support for the Tidemark migration engine,
//! using `tokio-rusqlite` for asynchronous database operations.
//!
//! # Features
//!
//! - Async/await support via `tokio-rusqlite`
//! - In-memory and file-based databases
//! - Transactional DDL, so each migration commits with its version record
//!
//! # Example
//!
//! ```rust,ignore
//! use tidemark_sqlite::{SqliteConfig, SqliteDatabase};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SqliteConfig::from_url("sqlite://./app.db")?;
//!     let db = SqliteDatabase::connect(config).await?;
//!
//!     // Hand the database to a Migrator...
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig};
pub use connection::SqliteDatabase;
pub use error::{SqliteError, SqliteResult};
