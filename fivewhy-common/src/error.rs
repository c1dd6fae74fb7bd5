//! Common error types for fivewhy

use thiserror::Error;

/// Common result type for fivewhy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the fivewhy crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record with the same key already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or record content
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
