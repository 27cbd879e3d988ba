//! Logging setup for the `tidemark` binary.
//!
//! Logs go to stderr so they never mix with command output. Nothing is
//! installed unless logging is requested.
//!
//! # Environment Variables
//!
//! - `TIDEMARK_DEBUG=true|1|yes` - Enable debug logging
//! - `TIDEMARK_LOG_LEVEL=trace|debug|info|warn|error` - Set specific log level
//! - `TIDEMARK_LOG_FORMAT=json|pretty|compact` - Set output format (default: compact)

use std::env;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Enables debug logging.
pub const DEBUG_VAR: &str = "TIDEMARK_DEBUG";
/// Overrides the log level.
pub const LEVEL_VAR: &str = "TIDEMARK_LOG_LEVEL";
/// Selects the output format.
pub const FORMAT_VAR: &str = "TIDEMARK_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

/// Whether a `TIDEMARK_DEBUG` value turns debugging on.
fn is_truthy(value: Option<&str>) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Resolve the level from the debug flag and an explicit level.
///
/// Returns `None` when logging was not requested at all.
fn resolve_level(debug: Option<&str>, level: Option<&str>) -> Option<&'static str> {
    let debug = is_truthy(debug);
    let fallback = if debug { "debug" } else { "warn" };

    match level {
        Some(level) => Some(match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        }),
        None if debug => Some("debug"),
        None => None,
    }
}

fn resolve_format(format: Option<&str>) -> LogFormat {
    match format.map(str::to_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::Compact,
    }
}

/// Install the global subscriber if logging was requested.
pub fn init() {
    let debug = env::var(DEBUG_VAR).ok();
    let level = env::var(LEVEL_VAR).ok();
    let Some(level) = resolve_level(debug.as_deref(), level.as_deref()) else {
        return;
    };
    let format = resolve_format(env::var(FORMAT_VAR).ok().as_deref());

    let filter = EnvFilter::try_new(format!(
        "tidemark={level},tidemark_cli={level},tidemark_migrate={level},\
         tidemark_mysql={level},tidemark_sqlite={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level, format = ?format, "Logging initialized");
    }
}
