//! `tracing` subscriber setup.

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive was rejected.
    #[error("invalid log filter {directive:?}: {reason}")]
    InvalidFilter {
        /// Directive as given.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("logging already initialized")]
    AlreadyInitialized,
}

/// Installs a global `tracing` subscriber filtered by `level`.
///
/// `level` accepts any `EnvFilter` directive, e.g. `"info"` or
/// `"paged_array=debug"`. Events carry their target and thread id.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    let filter = parse_filter(level)?;
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|err| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        reason: err.to_string(),
    })
}
