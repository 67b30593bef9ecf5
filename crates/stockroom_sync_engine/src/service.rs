//! Async surface over the inventory and its reconciler.
//!
//! The inventory and the reconciler are synchronous and block on file and
//! remote I/O. [`InventoryService`] runs each call on tokio's blocking pool
//! so async callers (the CLI, or a UI event loop) never stall the runtime.

use crate::error::{SyncError, SyncResult};
use crate::reconciler::{PushReport, Reconciler, RemoteSnapshot, SyncOutcome, SyncState, SyncStats};
use crate::remote::RemoteCollection;
use std::sync::Arc;
use stockroom_core::{
    Inventory, InventoryRecord, RecordFilter, RecordId, ReturnOutcome, TakenOutRecord,
};

/// Async handle to one inventory and its reconciler.
///
/// Cheap to clone; clones share the same inventory.
pub struct InventoryService<R: RemoteCollection + 'static> {
    inventory: Arc<Inventory>,
    reconciler: Arc<Reconciler<R>>,
}

impl<R: RemoteCollection + 'static> Clone for InventoryService<R> {
    fn clone(&self) -> Self {
        Self {
            inventory: Arc::clone(&self.inventory),
            reconciler: Arc::clone(&self.reconciler),
        }
    }
}

impl<R: RemoteCollection + 'static> InventoryService<R> {
    /// Creates a service from a reconciler; the inventory is the one the
    /// reconciler works on.
    pub fn new(reconciler: Reconciler<R>) -> Self {
        Self {
            inventory: Arc::clone(reconciler.inventory()),
            reconciler: Arc::new(reconciler),
        }
    }

    /// Returns the underlying inventory.
    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    /// Returns the underlying reconciler.
    pub fn reconciler(&self) -> &Arc<Reconciler<R>> {
        &self.reconciler
    }

    /// Adds a record built from `draft`.
    pub async fn add<T: InventoryRecord>(&self, draft: T::Draft) -> SyncResult<T> {
        self.with_inventory(move |inv| inv.add::<T>(draft)).await
    }

    /// Replaces the record with the same id. Returns false if none exists.
    pub async fn update<T: InventoryRecord>(&self, record: T) -> SyncResult<bool> {
        self.with_inventory(move |inv| inv.update(record)).await
    }

    /// Deletes the record with `id`, returning it if it existed.
    pub async fn delete<T: InventoryRecord>(&self, id: RecordId) -> SyncResult<Option<T>> {
        self.with_inventory(move |inv| inv.delete::<T>(&id)).await
    }

    /// Returns the record with `id`.
    pub async fn get<T: InventoryRecord>(&self, id: RecordId) -> SyncResult<Option<T>> {
        self.with_inventory(move |inv| inv.get::<T>(&id)).await
    }

    /// Returns all records of one kind.
    pub async fn list<T: InventoryRecord>(&self) -> SyncResult<Vec<T>> {
        self.with_inventory(|inv| inv.list::<T>()).await
    }

    /// Returns the records of one kind matching `filter`.
    pub async fn search<T: InventoryRecord>(&self, filter: RecordFilter) -> SyncResult<Vec<T>> {
        self.with_inventory(move |inv| inv.search::<T>(&filter)).await
    }

    /// Returns the distinct locations of one kind, sorted.
    pub async fn locations<T: InventoryRecord>(&self) -> SyncResult<Vec<String>> {
        self.with_inventory(|inv| inv.locations::<T>()).await
    }

    /// Moves one unit of a storage record out.
    pub async fn move_out(&self, storage_id: RecordId) -> SyncResult<TakenOutRecord> {
        self.with_inventory(move |inv| inv.move_out(&storage_id))
            .await
    }

    /// Returns one unit of a taken-out record to storage.
    pub async fn return_item(&self, taken_out_id: RecordId) -> SyncResult<ReturnOutcome> {
        self.with_inventory(move |inv| inv.return_item(&taken_out_id))
            .await
    }

    /// Returns the combined in-storage and taken-out quantity of one slot.
    pub async fn total_quantity(
        &self,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> SyncResult<u64> {
        let (name, location) = (name.into(), location.into());
        self.with_inventory(move |inv| inv.total_quantity(&name, &location))
            .await
    }

    /// Compares local and remote; see [`Reconciler::sync`].
    pub async fn sync(&self) -> SyncResult<SyncOutcome> {
        self.with_reconciler(|r| r.sync()).await
    }

    /// Pushes local records to the remote; see
    /// [`Reconciler::resolve_local_wins`].
    pub async fn resolve_local_wins(&self) -> SyncResult<PushReport> {
        self.with_reconciler(|r| r.resolve_local_wins()).await
    }

    /// Overwrites local records; see [`Reconciler::resolve_remote_wins`].
    pub async fn resolve_remote_wins(&self, remote: RemoteSnapshot) -> SyncResult<()> {
        self.with_reconciler(move |r| r.resolve_remote_wins(remote))
            .await
    }

    /// Returns the reconciler state.
    pub fn sync_state(&self) -> SyncState {
        self.reconciler.state()
    }

    /// Returns the reconciler statistics.
    pub fn sync_stats(&self) -> SyncStats {
        self.reconciler.stats()
    }

    /// Persists and closes the inventory.
    pub async fn close(&self) -> SyncResult<()> {
        self.with_inventory(|inv| inv.close()).await
    }

    async fn with_inventory<T, F>(&self, op: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inventory) -> stockroom_core::CoreResult<T> + Send + 'static,
    {
        let inventory = Arc::clone(&self.inventory);
        run_blocking(move || op(&inventory).map_err(SyncError::from)).await
    }

    async fn with_reconciler<T, F>(&self, op: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Reconciler<R>) -> SyncResult<T> + Send + 'static,
    {
        let reconciler = Arc::clone(&self.reconciler);
        run_blocking(move || op(&reconciler)).await
    }
}

impl<R: RemoteCollection + 'static> std::fmt::Debug for InventoryService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryService")
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

async fn run_blocking<T, F>(op: F) -> SyncResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> SyncResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| SyncError::Background(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::remote::MockRemote;
    use stockroom_core::{SequentialGenerator, StorageDraft, StorageRecord};
    use stockroom_storage::InMemoryBlobStore;

    fn service() -> InventoryService<MockRemote> {
        let inventory = Inventory::open_with_backends(
            Arc::new(InMemoryBlobStore::new()),
            Default::default(),
            Arc::new(SequentialGenerator::new("id-")),
        )
        .unwrap();
        InventoryService::new(Reconciler::new(
            SyncConfig::default(),
            MockRemote::new(),
            Arc::new(inventory),
        ))
    }

    #[tokio::test]
    async fn crud_through_service() {
        let service = service();
        let drill: StorageRecord = service
            .add(StorageDraft::new("Drill", "ShelfA", 3))
            .await
            .unwrap();

        let fetched: Option<StorageRecord> = service.get(drill.id.clone()).await.unwrap();
        assert_eq!(fetched.as_ref(), Some(&drill));

        let mut changed = drill.clone();
        changed.quantity = 5;
        assert!(service.update(changed).await.unwrap());

        let deleted: Option<StorageRecord> = service.delete(drill.id.clone()).await.unwrap();
        assert_eq!(deleted.unwrap().quantity, 5);
        assert!(service.list::<StorageRecord>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transfers_through_service() {
        let service = service();
        let drill: StorageRecord = service
            .add(StorageDraft::new("Drill", "ShelfA", 2))
            .await
            .unwrap();

        let out = service.move_out(drill.id.clone()).await.unwrap();
        assert_eq!(out.original_location, "ShelfA");
        assert_eq!(service.total_quantity("Drill", "ShelfA").await.unwrap(), 2);

        service.return_item(out.id).await.unwrap();
        assert!(service.list::<TakenOutRecord>().await.unwrap().is_empty());
        assert_eq!(
            service.locations::<StorageRecord>().await.unwrap(),
            vec!["ShelfA".to_string()]
        );
    }

    #[tokio::test]
    async fn concurrent_move_outs_are_serialized() {
        let service = service();
        let drill: StorageRecord = service
            .add(StorageDraft::new("Drill", "ShelfA", 10))
            .await
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = service.clone();
                let id = drill.id.clone();
                tokio::spawn(async move { service.move_out(id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let storage: Vec<StorageRecord> = service.list().await.unwrap();
        assert_eq!(storage[0].quantity, 0);
        let out: Vec<TakenOutRecord> = service.list().await.unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(service.total_quantity("Drill", "ShelfA").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn sync_through_service() {
        let service = service();
        assert!(service.sync().await.unwrap().is_identical());

        service
            .add::<StorageRecord>(StorageDraft::new("Saw", "Wall", 1))
            .await
            .unwrap();
        assert!(!service.sync().await.unwrap().is_identical());
        assert_eq!(service.sync_state(), SyncState::Divergent);

        let report = service.resolve_local_wins().await.unwrap();
        assert_eq!(report.pushed(), 1);
        assert!(service.sync().await.unwrap().is_identical());
        assert_eq!(service.sync_stats().syncs_completed, 3);
    }

    #[tokio::test]
    async fn closed_inventory_is_reported() {
        let service = service();
        service.close().await.unwrap();
        let err = service.list::<StorageRecord>().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Core(stockroom_core::CoreError::InventoryClosed)
        ));
    }
}
