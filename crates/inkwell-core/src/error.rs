//! Error types for inkwell-core

use thiserror::Error;

use crate::sync::RemoteError;

/// Result type alias using inkwell-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in inkwell-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Key/value backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote entry API error outside of reconciliation
    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
