//! Tidemark CLI - versioned SQL migrations for MySQL and SQLite.

use clap::Parser;

use tidemark_cli::cli::Cli;
use tidemark_cli::{logging, output};

#[tokio::main]
async fn main() {
    logging::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run the command and handle errors
    if let Err(e) = tidemark_cli::run(cli).await {
        tracing::debug!(error = ?e, "Command failed");
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
