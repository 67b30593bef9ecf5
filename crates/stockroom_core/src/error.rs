//! Error types for Stockroom core.

use crate::record::RecordId;
use crate::types::RecordKind;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Stockroom core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced record does not exist.
    #[error("{kind} record not found: {id}")]
    NotFound {
        /// The store that was searched.
        kind: RecordKind,
        /// The id that was not found.
        id: RecordId,
    },

    /// Move-out requested on a record whose quantity is already zero.
    #[error("insufficient quantity: storage record {id} has nothing left to move out")]
    InsufficientQuantity {
        /// The storage record id.
        id: RecordId,
    },

    /// Returning an item would overflow the storage quantity.
    #[error("quantity overflow on storage record {id}")]
    QuantityOverflow {
        /// The storage record id.
        id: RecordId,
    },

    /// A caller-supplied record violates a record invariant.
    #[error("invalid {kind} record: {message}")]
    InvalidRecord {
        /// The record kind.
        kind: RecordKind,
        /// What is wrong with it.
        message: String,
    },

    /// The inventory has been closed.
    #[error("inventory is closed")]
    InventoryClosed,

    /// Blob store read or write failure.
    #[error("persistence failure: {0}")]
    Persistence(#[from] stockroom_storage::StorageError),

    /// A persisted document could not be encoded or decoded.
    #[error("persistence failure: document {document}: {message}")]
    Codec {
        /// The blob key of the document.
        document: String,
        /// Codec error message.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(kind: RecordKind, id: &RecordId) -> Self {
        Self::NotFound {
            kind,
            id: id.clone(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(kind: RecordKind, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            kind,
            message: message.into(),
        }
    }

    /// Creates a codec error for a document.
    pub fn codec(document: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::Codec {
            document: document.into(),
            message: err.to_string(),
        }
    }

    /// Returns true if this error came from reading or writing local state.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Codec { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_storage::StorageError;

    #[test]
    fn not_found_display() {
        let err = CoreError::not_found(RecordKind::TakenOut, &RecordId::new("42"));
        let msg = err.to_string();
        assert!(msg.contains("taken-out"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn persistence_classification() {
        let storage: CoreError = StorageError::Unavailable("disk gone".into()).into();
        assert!(storage.is_persistence_failure());

        let err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        assert!(CoreError::codec("items.json", &err).is_persistence_failure());

        let err = CoreError::InsufficientQuantity {
            id: RecordId::new("1"),
        };
        assert!(!err.is_persistence_failure());
    }
}
