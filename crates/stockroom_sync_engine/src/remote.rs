//! Remote collection abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use stockroom_core::{Document, RecordId};

/// A remote document store holding one peer copy of the inventory.
///
/// Documents are untyped key/value maps; the reconciler sanitizes whatever
/// comes back. Implementations must not retry on their own.
pub trait RemoteCollection: Send + Sync {
    /// Returns every document in `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unavailable`] if the remote cannot be read.
    fn list_all(&self, collection: &str) -> SyncResult<Vec<Document>>;

    /// Inserts or replaces the document with `id` in `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unavailable`] if the write fails.
    fn upsert(&self, collection: &str, id: &RecordId, document: &Document) -> SyncResult<()>;

    /// Checks if the remote is reachable.
    fn is_connected(&self) -> bool {
        true
    }
}

impl<T: RemoteCollection + ?Sized> RemoteCollection for Arc<T> {
    fn list_all(&self, collection: &str) -> SyncResult<Vec<Document>> {
        (**self).list_all(collection)
    }

    fn upsert(&self, collection: &str, id: &RecordId, document: &Document) -> SyncResult<()> {
        (**self).upsert(collection, id, document)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Returns the id of a raw document as a string, if it has a usable one.
pub(crate) fn document_id(document: &Document) -> Option<String> {
    match document.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Replaces the document with `id` in `documents`, or appends it.
pub(crate) fn upsert_into(documents: &mut Vec<Document>, id: &RecordId, document: &Document) {
    let existing = documents
        .iter_mut()
        .find(|doc| document_id(doc).as_deref() == Some(id.as_str()));
    match existing {
        Some(slot) => *slot = document.clone(),
        None => documents.push(document.clone()),
    }
}

/// An in-memory remote for testing.
///
/// Supports toggling the connection and failing upserts after a given
/// number of successful ones.
#[derive(Debug)]
pub struct MockRemote {
    connected: AtomicBool,
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
    fail_upserts_after: Mutex<Option<usize>>,
    upserts: AtomicUsize,
}

impl MockRemote {
    /// Creates a new, empty, connected mock remote.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            collections: Mutex::new(BTreeMap::new()),
            fail_upserts_after: Mutex::new(None),
            upserts: AtomicUsize::new(0),
        }
    }

    /// Replaces the documents of a collection.
    pub fn set_documents(&self, collection: &str, documents: Vec<Document>) {
        self.collections
            .lock()
            .insert(collection.to_string(), documents);
    }

    /// Returns the documents of a collection.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes upserts fail once `limit` further upserts have succeeded.
    ///
    /// `None` disables the failure.
    pub fn fail_upserts_after(&self, limit: Option<usize>) {
        *self.fail_upserts_after.lock() = limit;
    }

    /// Returns the number of successful upserts so far.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteCollection for MockRemote {
    fn list_all(&self, collection: &str) -> SyncResult<Vec<Document>> {
        if !self.is_connected() {
            return Err(SyncError::unavailable("mock remote is disconnected"));
        }
        Ok(self.documents(collection))
    }

    fn upsert(&self, collection: &str, id: &RecordId, document: &Document) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::unavailable("mock remote is disconnected"));
        }

        {
            let mut budget = self.fail_upserts_after.lock();
            match budget.as_mut() {
                Some(0) => return Err(SyncError::unavailable("injected upsert failure")),
                Some(remaining) => *remaining -= 1,
                None => {}
            }
        }

        let mut collections = self.collections.lock();
        upsert_into(
            collections.entry(collection.to_string()).or_default(),
            id,
            document,
        );
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
