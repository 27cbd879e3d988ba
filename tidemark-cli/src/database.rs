//! Opening a driver from a connection URL.

use tidemark_migrate::Database;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Backend selected by a URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `mysql://`
    Mysql,
    /// `sqlite://`, `sqlite:` or `sqlite::memory:`
    Sqlite,
}

impl Backend {
    /// Pick the backend for a URL.
    pub fn from_url(url: &str) -> CliResult<Self> {
        if url.starts_with("mysql://") {
            Ok(Self::Mysql)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            let scheme = url.split(':').next().unwrap_or(url);
            Err(CliError::Config(format!(
                "unsupported database URL scheme '{}' (expected mysql:// or sqlite://)",
                scheme
            )))
        }
    }
}

/// Connect to the database named by `url`.
pub async fn connect(url: &str) -> CliResult<Box<dyn Database>> {
    let backend = Backend::from_url(url)?;
    debug!(backend = ?backend, "Connecting to database");

    match backend {
        #[cfg(feature = "mysql")]
        Backend::Mysql => {
            let db = tidemark_mysql::MysqlDatabase::from_url(url)
                .await
                .map_err(|e| CliError::Connection(e.to_string()))?;
            Ok(Box::new(db))
        }
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let db = tidemark_sqlite::SqliteDatabase::from_url(url)
                .await
                .map_err(|e| CliError::Connection(e.to_string()))?;
            Ok(Box::new(db))
        }
        #[allow(unreachable_patterns)]
        other => Err(CliError::Config(format!(
            "tidemark was built without {:?} support",
            other
        ))),
    }
}
