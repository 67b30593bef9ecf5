//! Blob store trait definition.

use crate::error::{StorageError, StorageResult};
use std::sync::Arc;

/// A keyed blob store for Stockroom documents.
///
/// Blob stores are **opaque**. They provide whole-document reads and writes
/// addressed by a short key. Stockroom owns the document format - stores do
/// not understand records, ids or JSON.
///
/// # Invariants
///
/// - `get` returns exactly the bytes of the last successful `put` for a key
/// - `get` returns `Ok(None)` for a key that was never written or was removed
/// - a failed `put` leaves the previous blob readable
/// - stores must be `Send + Sync` for shared access
///
/// # Implementors
///
/// - [`super::InMemoryBlobStore`] - For testing
/// - [`super::DirectoryBlobStore`] - For persistent storage
pub trait BlobStore: Send + Sync {
    /// Reads the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Removes the blob stored under `key`. Removing a missing key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or an I/O error occurs.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        (**self).put(key, data)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Checks that `key` can address a blob in every backend.
///
/// Keys must be non-empty, must not start with a dot (reserved for temporary
/// files) and must not contain path separators or NUL bytes.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] describing the first violated rule.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key(key, "key must not be empty"));
    }
    if key.starts_with('.') {
        return Err(StorageError::invalid_key(key, "key must not start with '.'"));
    }
    if key.contains(['/', '\\']) {
        return Err(StorageError::invalid_key(
            key,
            "path separators are not allowed",
        ));
    }
    if key.contains('\0') {
        return Err(StorageError::invalid_key(key, "NUL bytes are not allowed"));
    }
    Ok(())
}
