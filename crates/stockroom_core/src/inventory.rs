//! The inventory: both record stores behind a single mutation lock.
//!
//! Every entry point takes the same mutex, so a mutation (including its
//! persist step) completes before the next one starts. Transfers therefore
//! never interleave their read-decrement-write sequences, and a sync
//! resolution holding an [`InventoryGuard`] excludes all transfers.

use crate::config::InventoryConfig;
use crate::error::{CoreError, CoreResult};
use crate::query::{distinct_locations, RecordFilter};
use crate::record::{IdGenerator, RecordId, StorageRecord, TakenOutRecord, UuidGenerator};
use crate::store::RecordStore;
use crate::transfer::{slot_total, ReturnOutcome, TransferEngine};
use crate::types::RecordKind;
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::sync::Arc;
use stockroom_storage::{BlobStore, DirectoryBlobStore, InMemoryBlobStore};
use tracing::{debug, info, warn};

/// The two record stores plus the open flag, guarded together.
pub struct Stores {
    storage: RecordStore<StorageRecord>,
    taken_out: RecordStore<TakenOutRecord>,
    open: bool,
}

struct Backup {
    storage: Vec<StorageRecord>,
    taken_out: Vec<TakenOutRecord>,
}

impl Stores {
    fn ensure_open(&self) -> CoreResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(CoreError::InventoryClosed)
        }
    }

    fn backup(&self) -> Backup {
        Backup {
            storage: self.storage.snapshot(),
            taken_out: self.taken_out.snapshot(),
        }
    }

    fn restore(&mut self, backup: Backup) {
        self.storage.replace_all(backup.storage);
        self.taken_out.replace_all(backup.taken_out);
    }

    fn persist(&self, kinds: &[RecordKind]) -> CoreResult<()> {
        for kind in kinds {
            match kind {
                RecordKind::Storage => self.storage.persist()?,
                RecordKind::TakenOut => self.taken_out.persist()?,
            }
        }
        Ok(())
    }

    /// Persists `kinds` after a mutation and applies the failure policy.
    ///
    /// With a backup (strict mode) a failed write restores the backup,
    /// re-persists it and returns the error. Without one the failure is
    /// logged and the in-memory state is kept.
    fn commit(&mut self, kinds: &[RecordKind], backup: Option<Backup>) -> CoreResult<()> {
        let Err(err) = self.persist(kinds) else {
            return Ok(());
        };

        match backup {
            Some(backup) => {
                warn!(error = %err, "persist failed, rolling back in-memory state");
                self.restore(backup);
                if let Err(again) = self.persist(kinds) {
                    warn!(error = %again, "re-persist after rollback failed");
                }
                Err(err)
            }
            None => {
                warn!(error = %err, "persist failed, keeping in-memory state");
                Ok(())
            }
        }
    }
}

mod sealed {
    use super::Stores;
    use crate::record::{Record, StorageRecord, TakenOutRecord};
    use crate::store::RecordStore;

    pub trait Sealed: Record {
        fn store(stores: &Stores) -> &RecordStore<Self>;
        fn store_mut(stores: &mut Stores) -> &mut RecordStore<Self>;
    }

    impl Sealed for StorageRecord {
        fn store(stores: &Stores) -> &RecordStore<Self> {
            &stores.storage
        }

        fn store_mut(stores: &mut Stores) -> &mut RecordStore<Self> {
            &mut stores.storage
        }
    }

    impl Sealed for TakenOutRecord {
        fn store(stores: &Stores) -> &RecordStore<Self> {
            &stores.taken_out
        }

        fn store_mut(stores: &mut Stores) -> &mut RecordStore<Self> {
            &mut stores.taken_out
        }
    }
}

/// A record kind held by an [`Inventory`].
///
/// Implemented for [`StorageRecord`] and [`TakenOutRecord`] only.
pub trait InventoryRecord: sealed::Sealed {}

impl InventoryRecord for StorageRecord {}
impl InventoryRecord for TakenOutRecord {}

/// Both record stores of one inventory, with persistence and locking.
///
/// Constructed from persisted state at startup and torn down with a final
/// persist by [`Inventory::close`] (also run on drop).
///
/// # Example
///
/// ```rust
/// use stockroom_core::{Inventory, StorageDraft, StorageRecord};
///
/// let inventory = Inventory::open_in_memory().unwrap();
/// let drill: StorageRecord = inventory.add(StorageDraft::new("Drill", "ShelfA", 3)).unwrap();
///
/// let taken = inventory.move_out(&drill.id).unwrap();
/// assert_eq!(inventory.get::<StorageRecord>(&drill.id).unwrap().unwrap().quantity, 2);
///
/// inventory.return_item(&taken.id).unwrap();
/// assert_eq!(inventory.total_quantity("Drill", "ShelfA").unwrap(), 3);
/// ```
pub struct Inventory {
    config: InventoryConfig,
    ids: Arc<dyn IdGenerator>,
    state: Mutex<Stores>,
}

impl Inventory {
    /// Opens a file-backed inventory in `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, or in strict
    /// mode if either document cannot be loaded.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, InventoryConfig::default())
    }

    /// Opens a file-backed inventory in `path`.
    ///
    /// # Errors
    ///
    /// See [`Inventory::open`].
    pub fn open_with_config(path: &Path, config: InventoryConfig) -> CoreResult<Self> {
        let blobs = DirectoryBlobStore::open(path)?;
        Self::open_with_blobs(Arc::new(blobs), config)
    }

    /// Opens an inventory that lives only in memory.
    ///
    /// # Errors
    ///
    /// Does not fail in practice; the signature matches the other openers.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_blobs(Arc::new(InMemoryBlobStore::new()), InventoryConfig::default())
    }

    /// Opens an inventory over an arbitrary blob store with random ids.
    ///
    /// # Errors
    ///
    /// See [`Inventory::open`].
    pub fn open_with_blobs(blobs: Arc<dyn BlobStore>, config: InventoryConfig) -> CoreResult<Self> {
        Self::open_with_backends(blobs, config, Arc::new(UuidGenerator))
    }

    /// Opens an inventory over a blob store with a custom id generator.
    ///
    /// In lenient mode a document that cannot be read or decoded loads as an
    /// empty store and the failure is logged.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the load error of either document.
    pub fn open_with_backends(
        blobs: Arc<dyn BlobStore>,
        config: InventoryConfig,
        ids: Arc<dyn IdGenerator>,
    ) -> CoreResult<Self> {
        let storage: RecordStore<StorageRecord> = load_store(&blobs, &config, ids.as_ref())?;
        let taken_out: RecordStore<TakenOutRecord> = load_store(&blobs, &config, ids.as_ref())?;

        info!(
            storage = storage.len(),
            taken_out = taken_out.len(),
            strict = config.strict_persistence,
            "inventory opened"
        );

        Ok(Self {
            config,
            ids,
            state: Mutex::new(Stores {
                storage,
                taken_out,
                open: true,
            }),
        })
    }

    /// Returns the inventory configuration.
    #[must_use]
    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Returns the id generator used for new records.
    #[must_use]
    pub fn id_generator(&self) -> Arc<dyn IdGenerator> {
        Arc::clone(&self.ids)
    }

    // ========================================================================
    // Record CRUD
    // ========================================================================

    /// Adds a record and persists its store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] for a record that violates its
    /// invariants, or a persistence error in strict mode.
    pub fn add<R: InventoryRecord>(&self, draft: R::Draft) -> CoreResult<R> {
        let ids = self.ids.as_ref();
        let record = self.mutate(&[R::KIND], |stores| {
            let record = R::store_mut(stores).add(draft, ids)?;
            Ok((record, true))
        })?;
        debug!(kind = %R::KIND, id = %record.id(), "record added");
        Ok(record)
    }

    /// Replaces the record with the same id. Returns `false` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] for a record that violates its
    /// invariants, or a persistence error in strict mode.
    pub fn update<R: InventoryRecord>(&self, record: R) -> CoreResult<bool> {
        self.mutate(&[R::KIND], |stores| {
            let updated = R::store_mut(stores).update(record)?;
            Ok((updated, updated))
        })
    }

    /// Deletes the record with `id`. Returns the removed record, if any.
    ///
    /// # Errors
    ///
    /// Returns a persistence error in strict mode.
    pub fn delete<R: InventoryRecord>(&self, id: &RecordId) -> CoreResult<Option<R>> {
        self.mutate(&[R::KIND], |stores| {
            let removed = R::store_mut(stores).delete(id);
            let changed = removed.is_some();
            Ok((removed, changed))
        })
    }

    /// Returns the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InventoryClosed`] after close.
    pub fn get<R: InventoryRecord>(&self, id: &RecordId) -> CoreResult<Option<R>> {
        self.read(|stores| R::store(stores).get(id).cloned())
    }

    /// Returns every record of one kind in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InventoryClosed`] after close.
    pub fn list<R: InventoryRecord>(&self) -> CoreResult<Vec<R>> {
        self.read(|stores| R::store(stores).snapshot())
    }

    /// Returns the records of one kind that pass `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InventoryClosed`] after close.
    pub fn search<R: InventoryRecord>(&self, filter: &RecordFilter) -> CoreResult<Vec<R>> {
        self.read(|stores| filter.apply(R::store(stores).list()))
    }

    /// Returns the sorted distinct locations of one kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InventoryClosed`] after close.
    pub fn locations<R: InventoryRecord>(&self) -> CoreResult<Vec<String>> {
        self.read(|stores| distinct_locations(R::store(stores).list()))
    }

    /// Returns the number of records of one kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InventoryClosed`] after close.
    pub fn len<R: InventoryRecord>(&self) -> CoreResult<usize> {
        self.read(|stores| R::store(stores).len())
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    /// Moves one unit of a storage record out and persists both stores.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] or [`CoreError::InsufficientQuantity`]
    /// without changing anything, or a persistence error in strict mode.
    pub fn move_out(&self, storage_id: &RecordId) -> CoreResult<TakenOutRecord> {
        let ids = self.ids.as_ref();
        self.mutate(&RecordKind::ALL, |stores| {
            let taken = TransferEngine::new(&mut stores.storage, &mut stores.taken_out, ids)
                .move_out(storage_id)?;
            Ok((taken, true))
        })
    }

    /// Returns one unit of a taken-out record and persists both stores.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] or [`CoreError::QuantityOverflow`]
    /// without changing anything, or a persistence error in strict mode.
    pub fn return_item(&self, taken_out_id: &RecordId) -> CoreResult<ReturnOutcome> {
        let ids = self.ids.as_ref();
        self.mutate(&RecordKind::ALL, |stores| {
            let outcome = TransferEngine::new(&mut stores.storage, &mut stores.taken_out, ids)
                .return_item(taken_out_id)?;
            Ok((outcome, true))
        })
    }

    /// Returns the storage quantity plus matching taken-out quantities of a
    /// slot; transfers never change it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InventoryClosed`] after close.
    pub fn total_quantity(&self, name: &str, location: &str) -> CoreResult<u64> {
        self.read(|stores| slot_total(&stores.storage, &stores.taken_out, name, location))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Takes the mutation lock for a multi-step operation.
    ///
    /// Every other entry point blocks until the guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InventoryClosed`] after close.
    pub fn lock(&self) -> CoreResult<InventoryGuard<'_>> {
        let stores = self.state.lock();
        stores.ensure_open()?;
        Ok(InventoryGuard {
            stores,
            strict: self.config.strict_persistence,
            ids: self.ids.as_ref(),
        })
    }

    /// Persists both stores and closes the inventory. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the persist error in strict mode.
    pub fn close(&self) -> CoreResult<()> {
        let mut stores = self.state.lock();
        if !stores.open {
            return Ok(());
        }
        stores.open = false;

        match stores.persist(&RecordKind::ALL) {
            Ok(()) => {
                debug!("inventory closed");
                Ok(())
            }
            Err(err) if self.config.strict_persistence => Err(err),
            Err(err) => {
                warn!(error = %err, "final persist on close failed");
                Ok(())
            }
        }
    }

    /// Checks if the inventory is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn read<T>(&self, f: impl FnOnce(&Stores) -> T) -> CoreResult<T> {
        let stores = self.state.lock();
        stores.ensure_open()?;
        Ok(f(&stores))
    }

    /// Runs `op` under the lock, then persists `kinds` if it reports a change.
    fn mutate<T>(
        &self,
        kinds: &[RecordKind],
        op: impl FnOnce(&mut Stores) -> CoreResult<(T, bool)>,
    ) -> CoreResult<T> {
        let mut stores = self.state.lock();
        stores.ensure_open()?;

        let backup = self.config.strict_persistence.then(|| stores.backup());
        let (value, changed) = op(&mut stores)?;
        if changed {
            stores.commit(kinds, backup)?;
        }
        Ok(value)
    }
}

fn load_store<R: InventoryRecord>(
    blobs: &Arc<dyn BlobStore>,
    config: &InventoryConfig,
    ids: &dyn IdGenerator,
) -> CoreResult<RecordStore<R>> {
    let key = config.document_key(R::KIND);
    let store = match RecordStore::load(Arc::clone(blobs), key, config.create_if_missing, ids) {
        Ok(store) => store,
        Err(err) if config.strict_persistence => return Err(err),
        Err(err) => {
            warn!(kind = %R::KIND, key, error = %err, "failed to load document, starting empty");
            RecordStore::new(Arc::clone(blobs), key)
        }
    };
    Ok(store.with_pretty(config.pretty))
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for Inventory {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Exclusive access to both stores for a multi-step operation.
///
/// Used by the reconciler: it reads both snapshots and, for a remote-wins
/// resolution, replaces them, without any transfer running in between.
pub struct InventoryGuard<'a> {
    stores: MutexGuard<'a, Stores>,
    strict: bool,
    ids: &'a dyn IdGenerator,
}

impl InventoryGuard<'_> {
    /// Returns the records of one kind.
    pub fn records<R: InventoryRecord>(&self) -> &[R] {
        R::store(&self.stores).list()
    }

    /// Returns an owned copy of the records of one kind.
    pub fn snapshot<R: InventoryRecord>(&self) -> Vec<R> {
        R::store(&self.stores).snapshot()
    }

    /// Returns the id generator for sanitizing records.
    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids
    }

    /// Replaces both kinds and persists them as one step.
    ///
    /// The records go through [`RecordStore::ingest`]: invalid ones are
    /// dropped and duplicate ids are reassigned.
    ///
    /// # Errors
    ///
    /// Returns a persistence error in strict mode, after rolling both back.
    pub fn replace_both(
        &mut self,
        storage: Vec<StorageRecord>,
        taken_out: Vec<TakenOutRecord>,
    ) -> CoreResult<()> {
        let backup = self.strict.then(|| self.stores.backup());
        let ids = self.ids;
        self.stores.storage.ingest(storage, ids);
        self.stores.taken_out.ingest(taken_out, ids);
        self.stores.commit(&RecordKind::ALL, backup)
    }
}

impl std::fmt::Debug for InventoryGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryGuard")
            .field("storage", &self.stores.storage.len())
            .field("taken_out", &self.stores.taken_out.len())
            .finish_non_exhaustive()
    }
}
