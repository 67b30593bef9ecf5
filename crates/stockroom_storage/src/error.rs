//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key cannot be used to address a blob.
    #[error("invalid blob key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why the key was rejected.
        reason: &'static str,
    },

    /// The store refused the operation (used by test backends).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason,
        }
    }
}
