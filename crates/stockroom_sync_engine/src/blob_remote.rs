//! A remote collection kept as JSON documents in a blob store.
//!
//! Each collection is one blob, `<collection>.json`, holding a list of
//! objects. Pointed at a [`stockroom_storage::DirectoryBlobStore`] on a shared
//! or mounted directory this gives a peer copy without a server.

use crate::error::{SyncError, SyncResult};
use crate::remote::{upsert_into, RemoteCollection};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use stockroom_core::{Document, RecordId};
use stockroom_storage::BlobStore;
use tracing::warn;

/// Remote collections stored in a blob store.
pub struct BlobRemote {
    blobs: Arc<dyn BlobStore>,
    write_lock: Mutex<()>,
}

impl BlobRemote {
    /// Creates a remote over `blobs`.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            write_lock: Mutex::new(()),
        }
    }

    fn key(collection: &str) -> String {
        format!("{}.json", collection)
    }

    fn read(&self, collection: &str) -> SyncResult<Vec<Document>> {
        let key = Self::key(collection);
        let bytes = self
            .blobs
            .get(&key)
            .map_err(|e| SyncError::unavailable(format!("reading {}: {}", key, e)))?;

        let Some(bytes) = bytes else {
            return Ok(Vec::new());
        };

        let entries: Vec<Value> = serde_json::from_slice(&bytes).map_err(|e| {
            SyncError::Protocol(format!("{} is not a list of documents: {}", key, e))
        })?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(doc) => Some(doc),
                other => {
                    warn!(collection, value = %other, "skipping non-object remote entry");
                    None
                }
            })
            .collect())
    }
}

impl RemoteCollection for BlobRemote {
    fn list_all(&self, collection: &str) -> SyncResult<Vec<Document>> {
        self.read(collection)
    }

    fn upsert(&self, collection: &str, id: &RecordId, document: &Document) -> SyncResult<()> {
        let _guard = self.write_lock.lock();
        let mut documents = self.read(collection)?;
        upsert_into(&mut documents, id, document);

        let key = Self::key(collection);
        let bytes = serde_json::to_vec_pretty(&documents)
            .map_err(|e| SyncError::Codec(e.to_string()))?;
        self.blobs
            .put(&key, &bytes)
            .map_err(|e| SyncError::unavailable(format!("writing {}: {}", key, e)))
    }
}

impl std::fmt::Debug for BlobRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobRemote").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stockroom_storage::{DirectoryBlobStore, InMemoryBlobStore};
    use tempfile::tempdir;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn missing_collection_is_empty() {
        let remote = BlobRemote::new(Arc::new(InMemoryBlobStore::new()));
        assert!(remote.list_all("items").unwrap().is_empty());
    }

    #[test]
    fn upsert_writes_collection_document() {
        let dir = tempdir().unwrap();
        let blobs = Arc::new(DirectoryBlobStore::open(dir.path()).unwrap());
        let remote = BlobRemote::new(blobs);

        remote
            .upsert("items", &RecordId::new("a"), &doc(json!({"id": "a", "quantity": 1})))
            .unwrap();
        remote
            .upsert("items", &RecordId::new("a"), &doc(json!({"id": "a", "quantity": 4})))
            .unwrap();

        assert!(dir.path().join("items.json").exists());
        let docs = remote.list_all("items").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["quantity"], 4);
    }

    #[test]
    fn non_objects_are_skipped() {
        let blobs = Arc::new(InMemoryBlobStore::with_blob(
            "items.json",
            br#"[{"id": "a"}, 7, "x"]"#.to_vec(),
        ));
        let remote = BlobRemote::new(blobs);
        assert_eq!(remote.list_all("items").unwrap().len(), 1);
    }

    #[test]
    fn malformed_collection_is_protocol_error() {
        let blobs = Arc::new(InMemoryBlobStore::with_blob("items.json", b"{}".to_vec()));
        let remote = BlobRemote::new(blobs);
        assert!(matches!(remote.list_all("items"), Err(SyncError::Protocol(_))));
    }

    #[test]
    fn unreadable_store_is_unavailable() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        blobs.set_fail_reads(true);
        let remote = BlobRemote::new(blobs);
        assert!(matches!(
            remote.list_all("items"),
            Err(SyncError::Unavailable { .. })
        ));
    }
}
