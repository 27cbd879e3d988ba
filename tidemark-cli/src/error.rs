//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;
use tidemark_migrate::MigrationError;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(tidemark::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(tidemark::config))]
    Config(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    #[diagnostic(code(tidemark::connection))]
    Connection(String),

    /// Migration engine error
    #[error(transparent)]
    #[diagnostic(code(tidemark::migration))]
    Migration(#[from] MigrationError),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_is_transparent() {
        let err: CliError = MigrationError::UnknownVersion("99999999999999".to_string()).into();
        assert_eq!(err.to_string(), "Target version 99999999999999 does not exist");
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = CliError::Config("bad".to_string());
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("tidemark::config"));
    }
}
