//! CLI configuration handling.
//!
//! Values are layered: command-line flags, then `DATABASE_URL`, then
//! `tidemark.toml`, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tidemark_migrate::{DEFAULT_TABLE, MigratorConfig};

use crate::cli::GlobalArgs;
use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "tidemark.toml";

/// Default migrations directory (relative to project root)
pub const MIGRATIONS_DIR: &str = "db/migrations";

/// Tidemark configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Migration configuration
    pub migrations: MigrationsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load a file the user named, or the default file when present
    pub fn load_from(explicit: Option<&Path>) -> CliResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_or_default(Path::new(CONFIG_FILE_NAME)),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: Option<String>,
}

/// Migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory for migration files
    pub directory: PathBuf,

    /// Tracking table name
    pub table_name: String,

    /// Take the advisory lock for mutating commands
    pub lock: bool,

    /// Wrap each script in a transaction where the database allows it
    pub transactional: bool,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(MIGRATIONS_DIR),
            table_name: DEFAULT_TABLE.to_string(),
            lock: false,
            transactional: true,
        }
    }
}

/// Effective settings after layering flags, environment and file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Database connection URL, if any source provided one
    pub database_url: Option<String>,
    /// Directory for migration files
    pub migrations_dir: PathBuf,
    /// Tracking table name
    pub table_name: String,
    /// Take the advisory lock
    pub lock: bool,
    /// Wrap each script in a transaction
    pub transactional: bool,
}

impl Settings {
    /// Resolve settings from the global arguments and the config file.
    pub fn resolve(args: &GlobalArgs) -> CliResult<Self> {
        let config = Config::load_from(args.config.as_deref())?;
        Ok(Self::merge(args, config))
    }

    /// Layer the arguments over a loaded config.
    pub fn merge(args: &GlobalArgs, config: Config) -> Self {
        Self {
            database_url: args.database_url.clone().or(config.database.url),
            migrations_dir: args
                .migrations_dir
                .clone()
                .unwrap_or(config.migrations.directory),
            table_name: args.table.clone().unwrap_or(config.migrations.table_name),
            lock: args.lock || config.migrations.lock,
            transactional: !args.no_transaction && config.migrations.transactional,
        }
    }

    /// The database URL, or an error explaining how to provide one.
    pub fn require_database_url(&self) -> CliResult<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            CliError::Config(
                "no database URL: pass --database-url, set DATABASE_URL, or add [database] url to tidemark.toml"
                    .to_string(),
            )
        })
    }

    /// Runner configuration for these settings.
    pub fn migrator_config(&self) -> MigratorConfig {
        MigratorConfig::new()
            .migrations_dir(&self.migrations_dir)
            .table_name(&self.table_name)
            .lock(self.lock)
            .transactional(self.transactional)
    }
}
