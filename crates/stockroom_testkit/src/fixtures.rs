//! Test fixtures and inventory helpers.
//!
//! Provides convenience functions for setting up test inventories
//! and common test scenarios.

use std::path::Path;
use std::sync::Arc;
use stockroom_core::{
    Inventory, InventoryConfig, SequentialGenerator, StorageDraft, StorageRecord, TakenOutDraft,
    TakenOutRecord,
};
use stockroom_storage::{BlobStore, DirectoryBlobStore, InMemoryBlobStore};
use tempfile::TempDir;

/// A test inventory with automatic cleanup.
///
/// Ids are sequential (`id-1`, `id-2`, ...) so assertions can name them.
pub struct TestInventory {
    /// The inventory instance, shareable with a reconciler.
    pub inventory: Arc<Inventory>,
    config: InventoryConfig,
    blobs: Arc<dyn BlobStore>,
    memory: Option<Arc<InMemoryBlobStore>>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestInventory {
    /// Creates a new in-memory test inventory.
    pub fn memory() -> Self {
        Self::memory_with(InventoryConfig::default())
    }

    /// Creates a new in-memory test inventory with a custom configuration.
    pub fn memory_with(config: InventoryConfig) -> Self {
        let memory = Arc::new(InMemoryBlobStore::new());
        let blobs: Arc<dyn BlobStore> = memory.clone();
        Self {
            inventory: open(&blobs, &config),
            config,
            blobs,
            memory: Some(memory),
            _temp_dir: None,
        }
    }

    /// Creates a new file-based test inventory in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blobs: Arc<dyn BlobStore> = Arc::new(
            DirectoryBlobStore::open(temp_dir.path()).expect("Failed to open data directory"),
        );
        let config = InventoryConfig::default();
        Self {
            inventory: open(&blobs, &config),
            config,
            blobs,
            memory: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns a shared handle to the inventory.
    pub fn shared(&self) -> Arc<Inventory> {
        Arc::clone(&self.inventory)
    }

    /// Returns the blob store backing this inventory.
    pub fn blobs(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.blobs)
    }

    /// Returns the in-memory blob store, for failure injection.
    pub fn memory_blobs(&self) -> Option<&InMemoryBlobStore> {
        self.memory.as_deref()
    }

    /// Returns the data directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes the inventory and opens it again over the same blobs.
    pub fn reopen(self) -> Self {
        let Self {
            inventory,
            config,
            blobs,
            memory,
            _temp_dir,
        } = self;
        inventory.close().expect("Failed to close inventory");
        drop(inventory);

        Self {
            inventory: open(&blobs, &config),
            config,
            blobs,
            memory,
            _temp_dir,
        }
    }
}

fn open(blobs: &Arc<dyn BlobStore>, config: &InventoryConfig) -> Arc<Inventory> {
    let inventory = Inventory::open_with_backends(
        Arc::clone(blobs),
        config.clone(),
        Arc::new(SequentialGenerator::new("id-")),
    )
    .expect("Failed to open inventory");
    Arc::new(inventory)
}

impl std::ops::Deref for TestInventory {
    type Target = Inventory;

    fn deref(&self) -> &Self::Target {
        &self.inventory
    }
}

/// Runs a test with a temporary in-memory inventory.
///
/// # Example
///
/// ```rust
/// use stockroom_core::{StorageDraft, StorageRecord};
/// use stockroom_testkit::with_temp_inventory;
///
/// with_temp_inventory(|inventory| {
///     let drill: StorageRecord = inventory.add(StorageDraft::new("Drill", "ShelfA", 3)).unwrap();
///     assert_eq!(drill.id.as_str(), "id-1");
/// });
/// ```
pub fn with_temp_inventory<F, R>(f: F) -> R
where
    F: FnOnce(&Inventory) -> R,
{
    let test = TestInventory::memory();
    f(test.inventory.as_ref())
}

/// Runs a test with a temporary file-based inventory.
pub fn with_file_inventory<F, R>(f: F) -> R
where
    F: FnOnce(&Inventory, &Path) -> R,
{
    let test = TestInventory::file();
    let path = test.path().expect("File inventory should have a path").to_path_buf();
    f(test.inventory.as_ref(), &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A small workshop: a drill, a saw, screws, and one hammer already out.
    pub fn workshop() -> TestInventory {
        let test = TestInventory::memory();
        test.inventory
            .add::<StorageRecord>(StorageDraft::new("Drill", "ShelfA", 3))
            .expect("Failed to add drill");
        test.inventory
            .add::<StorageRecord>(StorageDraft::new("Saw", "Wall", 1).with_notes("hand saw"))
            .expect("Failed to add saw");
        test.inventory
            .add::<StorageRecord>(StorageDraft::new("Screws", "Drawer", 200))
            .expect("Failed to add screws");
        test.inventory
            .add::<TakenOutRecord>(TakenOutDraft::new("Hammer", "ShelfB", 1))
            .expect("Failed to add hammer");
        test
    }

    /// An inventory with `count` storage records spread over four locations.
    pub fn populated_inventory(count: usize) -> TestInventory {
        let test = TestInventory::memory();
        for i in 0..count {
            let draft = StorageDraft::new(
                format!("item_{}", i),
                format!("Shelf{}", i % 4),
                u32::try_from(i % 7).unwrap_or(0) + 1,
            );
            test.inventory
                .add::<StorageRecord>(draft)
                .expect("Failed to add record");
        }
        test
    }
}
