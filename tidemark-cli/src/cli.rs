//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tidemark - versioned SQL migrations for MySQL and SQLite
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "Tidemark - versioned SQL migrations for MySQL and SQLite", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to the configuration file [default: tidemark.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database connection URL (mysql://... or sqlite://...)
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Directory containing migration files
    #[arg(long, global = true)]
    pub migrations_dir: Option<PathBuf>,

    /// Name of the tracking table
    #[arg(long, global = true)]
    pub table: Option<String>,

    /// Take the advisory migration lock for mutating commands
    #[arg(long, global = true)]
    pub lock: bool,

    /// Run each migration without wrapping it in a transaction
    #[arg(long, global = true)]
    pub no_transaction: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new up/down migration pair
    Create(CreateArgs),

    /// Apply pending migrations
    Up(UpArgs),

    /// Roll back applied migrations
    Down(DownArgs),

    /// Show the current version, history, and catalog status
    #[command(alias = "status")]
    Version,

    /// Migrate up or down to an exact version
    Goto(GotoArgs),

    /// Load a .sql or .csv file into the database
    Import(ImportArgs),

    /// Dump all tables as SQL or CSV
    Export(ExportArgs),

    /// Remove a stale migration lock
    Unlock,
}

// =============================================================================
// Create Command
// =============================================================================

/// Arguments for the `create` command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Description used in the file names (e.g. create_users)
    pub name: String,
}

// =============================================================================
// Up / Down / Goto Commands
// =============================================================================

/// Arguments for the `up` command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Number of migrations to apply (0 or absent applies all)
    #[arg(default_value_t = 0)]
    pub steps: usize,
}

/// Arguments for the `down` command
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Number of migrations to roll back
    #[arg(default_value_t = 1)]
    pub steps: usize,
}

/// Arguments for the `goto` command
#[derive(Args, Debug)]
pub struct GotoArgs {
    /// Target version (YYYYMMDDHHMMSS)
    #[arg(id = "target_version", value_name = "VERSION")]
    pub version: String,
}

// =============================================================================
// Import / Export Commands
// =============================================================================

/// Arguments for the `import` command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File to import (.sql or .csv)
    pub path: PathBuf,
}

/// Arguments for the `export` command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Export format: sql or csv
    pub format: String,

    /// Output file (sql) or directory (csv)
    pub path: PathBuf,
}
