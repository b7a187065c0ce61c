//! Error types for dgr-core

use std::time::Duration;

use thiserror::Error;

/// Main error type for dgr-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure of a data-store query
///
/// Carries the underlying cause. Callers recover from it locally; it is
/// never fatal for the process.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Data store rejected query on {table}: {status} - {message}")]
    Store {
        table: &'static str,
        status: u16,
        message: String,
    },

    #[error("Failed to decode {table} rows: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for dgr-core
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for lookup operations
pub type LookupResult<T> = std::result::Result<T, LookupError>;
