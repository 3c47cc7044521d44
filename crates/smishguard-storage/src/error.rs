//! Storage errors.

use thiserror::Error;

/// Errors raised while reading or writing durable state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored value could not be encoded or decoded.
    #[error("invalid stored value: {0}")]
    Json(#[from] serde_json::Error),

    /// Creating the data directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The environment does not provide what storage needs.
    #[error("storage configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
