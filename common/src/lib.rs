use anyhow::{Context, Result};
use std::{fs, path::Path};
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the log filter chosen from verbosity flags.
pub const LOG_ENV_VAR: &str = "BOOK_LOG";

/// Maps a count of `-v` flags to a `tracing` filter directive.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global `tracing` subscriber, writing human-readable logs to stderr.
/// If `BOOK_LOG` is set, its value takes precedence over `verbosity`.
///
/// Calling this more than once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));

    // An error here only means a subscriber is already installed
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Reads a whole file as UTF-8 text, naming the path in the error chain.
///
/// # Errors
/// This function returns an error if the file cannot be opened or is not valid UTF-8.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))
}

/// Writes text to a file, replacing any existing contents and naming the path in the error chain.
///
/// # Errors
/// This function returns an error if the file cannot be created or written to.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("failed to write {path:?}"))
}
