//! Error types for the migration engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::Direction;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database operation error outside of a migration script.
    #[error("Database error: {0}")]
    Database(String),

    /// The migrations directory is missing or unreadable.
    #[error("Migrations directory '{}' is unavailable: {reason}", dir.display())]
    CatalogUnavailable {
        /// Directory that was scanned.
        dir: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// A migration-suffixed file does not follow `{version}_{description}`.
    #[error("Invalid migration file name: {0}")]
    InvalidMigrationName(String),

    /// A version identifier is not a 14-digit timestamp.
    #[error("Invalid migration version '{0}' (expected YYYYMMDDHHMMSS)")]
    InvalidVersion(String),

    /// A migration script could not be read.
    #[error("Failed to read migration file {}: {source}", path.display())]
    FileRead {
        /// Path of the script.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A migration script failed while executing.
    #[error("Migration {file} failed: {message}")]
    Execution {
        /// File name of the failing script.
        file: String,
        /// Database error message.
        message: String,
    },

    /// No `down` script exists for a version being rolled back.
    #[error("No rollback file found for version {0}")]
    MissingRollbackFile(String),

    /// `goto` target is not part of the catalog.
    #[error("Target version {0} does not exist")]
    UnknownVersion(String),

    /// A version was recorded twice in the tracking table.
    #[error("Version {0} is already recorded as applied")]
    DuplicateVersion(String),

    /// More than one script matches a version and direction.
    #[error("Multiple {direction} files for version {version}: {}", files.join(", "))]
    DuplicateMigrationFile {
        /// Version with ambiguous files.
        version: String,
        /// Direction of the ambiguous scripts.
        direction: Direction,
        /// Conflicting file names.
        files: Vec<String>,
    },

    /// Another invocation holds the migration lock.
    #[error("Migration lock is held by {owner} since {locked_at}")]
    LockHeld {
        /// Holder recorded in the lock row.
        owner: String,
        /// When the lock was taken.
        locked_at: String,
    },

    /// Import or export format is not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(String),
}

impl MigrationError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an execution error for a script.
    pub fn execution(file: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Execution {
            file: file.into(),
            message: msg.into(),
        }
    }

    /// Create a catalog error for a directory.
    pub fn catalog_unavailable(dir: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CatalogUnavailable {
            dir: dir.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<csv::Error> for MigrationError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}
