//! Run logging.
//!
//! Events go to stderr and to the run log in the state directory. The log
//! file is truncated at the start of every run, so its tail is what the
//! failure artifact quotes.
//!
//! Filtering follows `RUST_LOG`; without it only this crate's `info` events
//! and above are shown.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub const DEFAULT_FILTER: &str = "drive_notes=info";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot install logger: {0}")]
    Init(String),
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber, teeing to stderr and `log_file`.
pub fn init(log_file: &Path) -> Result<(), LoggingError> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = Arc::new(File::create(log_file)?);
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_ansi(false)
        .with_writer(std::io::stderr.and(file))
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

/// Install a stderr-only subscriber, for commands that keep no run log.
pub fn init_stderr() -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
