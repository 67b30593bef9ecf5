//! Record store: the sole mutable owner of one kind of record.

use crate::error::{CoreError, CoreResult};
use crate::record::{IdGenerator, Record, RecordId};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stockroom_storage::BlobStore;
use tracing::{debug, warn};

/// An ordered, in-memory collection of records backed by one blob document.
///
/// The store never writes implicitly. Every mutation is followed by an
/// explicit [`RecordStore::persist`] call from the owner, which serializes the
/// whole collection as a JSON list of objects.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use stockroom_core::{Record, RecordStore, StorageDraft, StorageRecord, UuidGenerator};
/// use stockroom_storage::InMemoryBlobStore;
///
/// let blobs = Arc::new(InMemoryBlobStore::new());
/// let mut store: RecordStore<StorageRecord> = RecordStore::new(blobs, "items.json");
/// let drill = store.add(StorageDraft::new("Drill", "ShelfA", 3), &UuidGenerator).unwrap();
/// store.persist().unwrap();
/// assert_eq!(store.get(drill.id()).map(|r| r.quantity), Some(3));
/// ```
#[derive(Clone)]
pub struct RecordStore<R: Record> {
    key: String,
    blobs: Arc<dyn BlobStore>,
    records: Vec<R>,
    pretty: bool,
}

impl<R: Record> fmt::Debug for RecordStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("kind", &R::KIND)
            .field("key", &self.key)
            .field("records", &self.records.len())
            .finish()
    }
}

impl<R: Record> RecordStore<R> {
    /// Creates an empty store writing to `key`. Nothing is read or written.
    pub fn new(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            blobs,
            records: Vec::new(),
            pretty: true,
        }
    }

    /// Sets whether the persisted document is pretty-printed.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Loads the store from its blob document.
    ///
    /// A missing document yields an empty store; if `create_if_missing` is
    /// set an empty document is written as well. Entries are sanitized on
    /// read, so records written by older versions (integer ids, missing
    /// notes) load cleanly. Entries that are not objects are skipped and the
    /// rest go through [`RecordStore::ingest`].
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the blob cannot be read, is not a JSON
    /// list, or the empty document cannot be created.
    pub fn load(
        blobs: Arc<dyn BlobStore>,
        key: impl Into<String>,
        create_if_missing: bool,
        ids: &dyn IdGenerator,
    ) -> CoreResult<Self> {
        let mut store = Self::new(blobs, key);

        let Some(bytes) = store.blobs.get(&store.key)? else {
            debug!(kind = %R::KIND, key = %store.key, "no document found, starting empty");
            if create_if_missing {
                store.persist()?;
            }
            return Ok(store);
        };

        let entries: Vec<Value> =
            serde_json::from_slice(&bytes).map_err(|e| CoreError::codec(&store.key, &e))?;

        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match entry {
                Value::Object(doc) => records.push(R::sanitize(&doc, ids)),
                other => warn!(
                    kind = %R::KIND,
                    index,
                    value = %other,
                    "skipping non-object entry in document"
                ),
            }
        }
        store.ingest(records, ids);

        debug!(kind = %R::KIND, count = store.records.len(), "record store loaded");
        Ok(store)
    }

    /// Writes the full collection to the blob document.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if encoding or writing fails.
    pub fn persist(&self) -> CoreResult<()> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&self.records)
        } else {
            serde_json::to_vec(&self.records)
        }
        .map_err(|e| CoreError::codec(&self.key, &e))?;

        self.blobs.put(&self.key, &bytes)?;
        Ok(())
    }

    /// Returns the blob key of the backing document.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Adds a record built from `draft` under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] if the record violates its
    /// invariants; the store is unchanged.
    pub fn add(&mut self, draft: R::Draft, ids: &dyn IdGenerator) -> CoreResult<R> {
        let record = R::from_draft(self.fresh_id(ids), draft);
        record.validate()?;
        self.records.push(record.clone());
        Ok(record)
    }

    /// Replaces the record with the same id.
    ///
    /// Returns `false` (and changes nothing) if no record has that id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] if the replacement violates its
    /// invariants; the store is unchanged.
    pub fn update(&mut self, record: R) -> CoreResult<bool> {
        record.validate()?;
        match self.position(record.id()) {
            Some(index) => {
                self.records[index] = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the record with `id`. Returns the removed record, if any.
    pub fn delete(&mut self, id: &RecordId) -> Option<R> {
        self.position(id).map(|index| self.records.remove(index))
    }

    /// Returns the record with `id`.
    pub fn get(&self, id: &RecordId) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &RecordId) -> Option<&mut R> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    /// Returns the index of the record with `id`.
    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    /// Returns the index of the first record in the given stock slot.
    pub fn find_slot(&self, name: &str, location: &str) -> Option<usize> {
        self.records.iter().position(|r| r.same_slot(name, location))
    }

    pub(crate) fn record_at_mut(&mut self, index: usize) -> &mut R {
        &mut self.records[index]
    }

    pub(crate) fn push(&mut self, record: R) {
        self.records.push(record);
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> R {
        self.records.remove(index)
    }

    /// Returns all records in insertion order.
    pub fn list(&self) -> &[R] {
        &self.records
    }

    /// Returns an owned copy of all records.
    pub fn snapshot(&self) -> Vec<R> {
        self.records.clone()
    }

    pub(crate) fn replace_all(&mut self, records: Vec<R>) {
        self.records = records;
    }

    /// Replaces the entire contents with records read from outside the store.
    ///
    /// A record that violates its invariants is dropped. A record whose id is
    /// already taken by an earlier one gets a fresh id from `ids`. Does not
    /// persist.
    pub fn ingest(&mut self, records: Vec<R>, ids: &dyn IdGenerator) {
        self.records.clear();
        self.records.reserve(records.len());
        for mut record in records {
            if let Err(e) = record.validate() {
                warn!(kind = %R::KIND, id = %record.id(), error = %e, "dropping invalid record");
                continue;
            }
            if self.get(record.id()).is_some() {
                let fresh = self.fresh_id(ids);
                warn!(
                    kind = %R::KIND,
                    duplicate = %record.id(),
                    id = %fresh,
                    "reassigning duplicate id"
                );
                record.set_id(fresh);
            }
            self.records.push(record);
        }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Draws ids until one is not already in use.
    pub(crate) fn fresh_id(&self, ids: &dyn IdGenerator) -> RecordId {
        loop {
            let id = ids.generate();
            if self.get(&id).is_none() {
                return id;
            }
            warn!(kind = %R::KIND, %id, "id generator returned an id already in use");
        }
    }
}
