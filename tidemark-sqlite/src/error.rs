//! Error types for SQLite operations.

use std::fmt;

use tidemark_migrate::MigrationError;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug)]
pub enum SqliteError {
    /// SQLite driver error.
    Sqlite(tokio_rusqlite::Error),
    /// Configuration error.
    Config(String),
    /// Connection error.
    Connection(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}

impl fmt::Display for SqliteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Connection(msg) => write!(f, "Connection error: {}", msg),
        }
    }
}

impl std::error::Error for SqliteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tokio_rusqlite::Error> for SqliteError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

impl From<SqliteError> for MigrationError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Sqlite(tokio_rusqlite::Error::Rusqlite(e)) => {
                MigrationError::database(e.to_string())
            }
            SqliteError::Sqlite(tokio_rusqlite::Error::ConnectionClosed) => {
                MigrationError::connection("connection closed")
            }
            SqliteError::Sqlite(e) => MigrationError::database(e.to_string()),
            SqliteError::Config(msg) => MigrationError::connection(format!("config: {}", msg)),
            SqliteError::Connection(msg) => MigrationError::connection(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SqliteError::config("invalid path");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("invalid path"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(SqliteError::config("test"), SqliteError::Config(_)));
        assert!(matches!(
            SqliteError::connection("test"),
            SqliteError::Connection(_)
        ));
    }

    #[test]
    fn test_error_conversion() {
        let err: MigrationError = SqliteError::connection("unable to open").into();
        assert!(matches!(err, MigrationError::Connection(_)));

        let err: MigrationError = SqliteError::config("bad url").into();
        assert!(matches!(err, MigrationError::Connection(_)));

        let err: MigrationError =
            SqliteError::from(rusqlite::Error::InvalidQuery).into();
        assert!(matches!(err, MigrationError::Database(_)));
    }
}
