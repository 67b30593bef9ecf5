//! In-memory blob store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_key, BlobStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory blob store.
///
/// This store keeps all blobs in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral inventories that don't need persistence
///
/// Reads and writes can be made to fail on demand, which lets tests drive
/// the persistence-failure paths of the record stores.
///
/// # Example
///
/// ```rust
/// use stockroom_storage::{BlobStore, InMemoryBlobStore};
///
/// let store = InMemoryBlobStore::new();
/// assert_eq!(store.get("missing").unwrap(), None);
/// store.put("doc", b"data").unwrap();
/// assert_eq!(store.get("doc").unwrap(), Some(b"data".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryBlobStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one blob.
    ///
    /// Useful for testing load paths.
    #[must_use]
    pub fn with_blob(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store.blobs.write().insert(key.into(), data.into());
        store
    }

    /// Makes every subsequent `get` fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `put`/`remove` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("reads disabled".into()));
        }
        Ok(self.blobs.read().get(key).cloned())
    }

    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.blobs.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.blobs.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryBlobStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("items.json").unwrap(), None);
    }

    #[test]
    fn memory_put_then_get() {
        let store = InMemoryBlobStore::new();
        store.put("items.json", b"[1]").unwrap();
        assert_eq!(store.get("items.json").unwrap(), Some(b"[1]".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_put_replaces() {
        let store = InMemoryBlobStore::new();
        store.put("doc", b"first").unwrap();
        store.put("doc", b"second").unwrap();
        assert_eq!(store.get("doc").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn memory_remove_missing_is_noop() {
        let store = InMemoryBlobStore::new();
        store.remove("nothing").unwrap();
        store.put("doc", b"x").unwrap();
        store.remove("doc").unwrap();
        assert_eq!(store.get("doc").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn memory_with_blob() {
        let store = InMemoryBlobStore::with_blob("preloaded", b"data".to_vec());
        assert_eq!(store.get("preloaded").unwrap(), Some(b"data".to_vec()));
    }

    #[test]
    fn memory_injected_write_failure_keeps_old_blob() {
        let store = InMemoryBlobStore::new();
        store.put("doc", b"old").unwrap();
        store.set_fail_writes(true);

        assert!(matches!(
            store.put("doc", b"new"),
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(store.get("doc").unwrap(), Some(b"old".to_vec()));

        store.set_fail_writes(false);
        store.put("doc", b"new").unwrap();
        assert_eq!(store.get("doc").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn memory_injected_read_failure() {
        let store = InMemoryBlobStore::new();
        store.set_fail_reads(true);
        assert!(store.get("doc").is_err());
    }

    #[test]
    fn memory_rejects_invalid_key() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(
            store.put("../x", b""),
            Err(StorageError::InvalidKey { .. })
        ));
    }
}
