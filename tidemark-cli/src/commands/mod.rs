//! CLI command implementations.

pub mod data;
pub mod migrate;

use tidemark_migrate::{Database, Migrator};

use crate::config::Settings;
use crate::database;
use crate::error::CliResult;

/// Connect to the configured database.
pub(crate) async fn open_database(settings: &Settings) -> CliResult<Box<dyn Database>> {
    database::connect(settings.require_database_url()?).await
}

/// Connect and build a runner for the configured migrations.
pub(crate) async fn open_migrator(settings: &Settings) -> CliResult<Migrator<Box<dyn Database>>> {
    let db = open_database(settings).await?;
    Ok(Migrator::new(settings.migrator_config(), db))
}
