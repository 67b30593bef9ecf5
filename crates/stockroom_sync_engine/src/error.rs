//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote collection could not be reached or read.
    #[error("sync unavailable: {message}")]
    Unavailable {
        /// Human-readable cause.
        message: String,
    },

    /// An upsert loop stopped partway; earlier upserts are not rolled back.
    #[error("partial write to {collection}: {completed} of {total} records upserted: {message}")]
    PartialWrite {
        /// The remote collection being written.
        collection: String,
        /// Records of this collection already upserted.
        completed: usize,
        /// Records of this collection to upsert in total.
        total: usize,
        /// Cause of the failing upsert.
        message: String,
    },

    /// The remote returned something that is not a list of documents.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local inventory error during sync.
    #[error("inventory error: {0}")]
    Core(#[from] stockroom_core::CoreError),

    /// A sync operation was started while another one is running.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted operation.
        to: String,
    },

    /// The push cursor could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// A background task running a blocking operation failed.
    #[error("background task failed: {0}")]
    Background(String),
}

impl SyncError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns true if re-running the operation can succeed.
    ///
    /// The core never retries by itself; this is for the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Unavailable { .. } | SyncError::PartialWrite { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{CoreError, RecordId};

    #[test]
    fn retryable_errors() {
        assert!(SyncError::unavailable("connection refused").is_retryable());
        assert!(SyncError::PartialWrite {
            collection: "items".into(),
            completed: 1,
            total: 2,
            message: "timeout".into(),
        }
        .is_retryable());
        assert!(!SyncError::Protocol("not a list".into()).is_retryable());

        let core: SyncError = CoreError::InsufficientQuantity {
            id: RecordId::new("1"),
        }
        .into();
        assert!(!core.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::unavailable("connection refused");
        assert_eq!(err.to_string(), "sync unavailable: connection refused");

        let err = SyncError::PartialWrite {
            collection: "takenOutItems".into(),
            completed: 3,
            total: 5,
            message: "reset".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("takenOutItems"));
        assert!(msg.contains("3 of 5"));
    }
}
