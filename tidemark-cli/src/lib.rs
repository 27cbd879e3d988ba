//! Tidemark CLI - Command-line interface for Tidemark migrations.
//!
//! This crate provides the `tidemark` binary: creating migration pairs,
//! moving the database between versions, and importing or exporting data.

pub mod cli;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod output;

use cli::{Cli, Command};
use config::Settings;
use error::CliResult;

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> CliResult<()> {
    let settings = Settings::resolve(&cli.global)?;
    tracing::debug!(
        migrations_dir = %settings.migrations_dir.display(),
        table = %settings.table_name,
        lock = settings.lock,
        "Resolved settings"
    );

    match cli.command {
        Command::Create(args) => commands::migrate::run_create(args, &settings).await,
        Command::Up(args) => commands::migrate::run_up(args, &settings).await,
        Command::Down(args) => commands::migrate::run_down(args, &settings).await,
        Command::Version => commands::migrate::run_status(&settings).await,
        Command::Goto(args) => commands::migrate::run_goto(args, &settings).await,
        Command::Import(args) => commands::data::run_import(args, &settings).await,
        Command::Export(args) => commands::data::run_export(args, &settings).await,
        Command::Unlock => commands::migrate::run_unlock(&settings).await,
    }
}
