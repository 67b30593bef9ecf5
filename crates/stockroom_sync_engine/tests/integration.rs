//! Integration tests for the reconciler against the remote adapters.

use serde_json::{json, Value};
use std::sync::Arc;
use stockroom_core::{
    Document, InventoryConfig, Record, RecordId, StorageDraft, StorageRecord, TakenOutRecord,
};
use stockroom_storage::{BlobStore, DirectoryBlobStore, InMemoryBlobStore};
use stockroom_sync_engine::{
    BlobRemote, InventoryService, MockRemote, Reconciler, RemoteCollection, SyncConfig,
    SyncError, SyncOutcome, SyncState,
};
use stockroom_testkit::prelude::*;
use tempfile::TempDir;

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("test document must be an object"),
    }
}

fn reconciler(test: &TestInventory, remote: MockRemote) -> Reconciler<MockRemote> {
    Reconciler::new(SyncConfig::default(), remote, test.shared())
}

#[test]
fn move_out_and_return_drill() {
    let test = TestInventory::memory();
    let drill: StorageRecord = test
        .add(StorageDraft::new("Drill", "ShelfA", 3))
        .unwrap();

    let out = test.move_out(&drill.id).unwrap();
    assert_eq!(out.name, "Drill");
    assert_eq!(out.original_location, "ShelfA");
    assert_eq!(out.quantity, 1);
    assert_eq!(test.get::<StorageRecord>(&drill.id).unwrap().unwrap().quantity, 2);

    test.return_item(&out.id).unwrap();
    assert!(test.get::<TakenOutRecord>(&out.id).unwrap().is_none());
    assert_eq!(test.get::<StorageRecord>(&drill.id).unwrap().unwrap().quantity, 3);
    assert_eq!(test.total_quantity("Drill", "ShelfA").unwrap(), 3);
}

#[test]
fn local_wins_makes_remote_identical() {
    let test = TestInventory::memory();
    let a: StorageRecord = test.add(StorageDraft::new("Drill", "ShelfA", 3)).unwrap();
    let b: StorageRecord = test.add(StorageDraft::new("Saw", "Wall", 1)).unwrap();

    let remote = MockRemote::new();
    remote.set_documents("items", vec![a.to_document(), {
        let mut changed = b.to_document();
        changed.insert("quantity".into(), json!(7));
        changed
    }]);

    let reconciler = reconciler(&test, remote);
    let SyncOutcome::Divergent { report, .. } = reconciler.sync().unwrap() else {
        panic!("expected divergence");
    };
    assert_eq!(report.storage.changed, vec![b.id.clone()]);
    assert!(report.storage.only_local.is_empty());
    assert!(report.taken_out.is_identical());

    let pushed = reconciler.resolve_local_wins().unwrap();
    assert_eq!(pushed.storage_pushed, 2);

    let documents = reconciler.remote().documents("items");
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1]["quantity"], 1);
    assert!(reconciler.sync().unwrap().is_identical());
    assert_eq!(reconciler.state(), SyncState::Identical);
}

#[test]
fn local_wins_keeps_remote_extras() {
    let test = TestInventory::memory();
    test.add::<StorageRecord>(StorageDraft::new("Drill", "ShelfA", 3))
        .unwrap();

    let remote = MockRemote::new();
    remote.set_documents(
        "items",
        vec![doc(json!({
            "id": "remote-only",
            "name": "Tape",
            "location": "Drawer",
            "quantity": 2,
            "notes": ""
        }))],
    );
    let reconciler = reconciler(&test, remote);
    reconciler.resolve_local_wins().unwrap();

    assert_eq!(reconciler.remote().documents("items").len(), 2);
    let SyncOutcome::Divergent { report, .. } = reconciler.sync().unwrap() else {
        panic!("remote extras still differ");
    };
    assert_eq!(report.storage.only_remote, vec![RecordId::new("remote-only")]);
}

#[test]
fn remote_wins_then_sync_is_identical() {
    let test = scenarios::workshop();
    let remote = MockRemote::new();
    remote.set_documents(
        "items",
        vec![
            doc(json!({"id": 1, "name": "Drill", "location": "ShelfA", "quantity": 9})),
            doc(json!({"name": "Tape"})),
        ],
    );
    let reconciler = reconciler(&test, remote);

    let SyncOutcome::Divergent { remote, .. } = reconciler.sync().unwrap() else {
        panic!("expected divergence");
    };
    reconciler.resolve_remote_wins(remote).unwrap();

    let storage = test.list::<StorageRecord>().unwrap();
    assert_eq!(storage.len(), 2);
    assert_eq!(storage[0].id.as_str(), "1");
    assert_eq!(storage[0].quantity, 9);
    assert_eq!(storage[1].location, "");
    assert!(test.list::<TakenOutRecord>().unwrap().is_empty());

    // The id-less remote document gets a fresh id on every fetch, so only
    // the document with an id converges.
    let SyncOutcome::Divergent { report, .. } = reconciler.sync().unwrap() else {
        panic!("id-less remote documents never converge");
    };
    assert!(report.storage.changed.is_empty());
    assert_eq!(report.storage.only_remote.len(), 1);
    assert!(report.taken_out.is_identical());
}

#[test]
fn remote_wins_admits_only_valid_unique_records() {
    let test = TestInventory::file();
    let remote = MockRemote::new();
    remote.set_documents(
        "items",
        vec![
            doc(json!({"id": "1", "name": "Drill", "location": "ShelfA", "quantity": 0})),
            doc(json!({"id": "1", "name": "Drill", "location": "ShelfB", "quantity": 2})),
        ],
    );
    remote.set_documents(
        "takenOutItems",
        vec![doc(json!({
            "id": "t0",
            "name": "Drill",
            "originalLocation": "ShelfA",
            "quantity": 0
        }))],
    );
    {
        let reconciler = reconciler(&test, remote);
        let SyncOutcome::Divergent { remote, .. } = reconciler.sync().unwrap() else {
            panic!("expected divergence");
        };
        reconciler.resolve_remote_wins(remote).unwrap();
    }

    let test = test.reopen();
    let storage = test.list::<StorageRecord>().unwrap();
    assert_eq!(storage.len(), 2);
    assert_eq!(storage[0].id.as_str(), "1");
    assert_eq!(storage[0].location, "ShelfA");
    assert_ne!(storage[1].id, storage[0].id);
    assert!(test.list::<TakenOutRecord>().unwrap().is_empty());

    assert!(test.return_item(&RecordId::new("t0")).is_err());
    assert_eq!(test.total_quantity("Drill", "ShelfA").unwrap(), 0);
    assert_eq!(test.total_quantity("Drill", "ShelfB").unwrap(), 2);
}

#[test]
fn remote_wins_with_clean_remote_converges() {
    let test = scenarios::workshop();
    let remote = MockRemote::new();
    remote.set_documents(
        "takenOutItems",
        vec![doc(json!({
            "id": "t1",
            "name": "Drill",
            "originalLocation": "ShelfA",
            "quantity": 1,
            "notes": ""
        }))],
    );
    let reconciler = reconciler(&test, remote);

    let SyncOutcome::Divergent { remote, .. } = reconciler.sync().unwrap() else {
        panic!("expected divergence");
    };
    reconciler.resolve_remote_wins(remote).unwrap();

    assert!(test.list::<StorageRecord>().unwrap().is_empty());
    assert_eq!(test.len::<TakenOutRecord>().unwrap(), 1);
    assert!(reconciler.sync().unwrap().is_identical());
}

#[test]
fn unavailable_remote_mutates_nothing() {
    let test = scenarios::workshop();
    let before = test.list::<StorageRecord>().unwrap();
    let remote = MockRemote::new();
    remote.set_connected(false);
    let reconciler = reconciler(&test, remote);

    let err = reconciler.sync().unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, SyncError::Unavailable { .. }));
    assert!(matches!(
        reconciler.resolve_local_wins(),
        Err(SyncError::PartialWrite { completed: 0, .. })
    ));
    assert_eq!(test.list::<StorageRecord>().unwrap(), before);
    assert_eq!(reconciler.state(), SyncState::Error);
}

#[test]
fn partial_push_is_resumed_on_retry() {
    let test = scenarios::populated_inventory(5);
    let remote = MockRemote::new();
    remote.fail_upserts_after(Some(3));
    let reconciler = reconciler(&test, remote);

    match reconciler.resolve_local_wins() {
        Err(SyncError::PartialWrite {
            collection,
            completed,
            total,
            ..
        }) => {
            assert_eq!(collection, "items");
            assert_eq!(completed, 3);
            assert_eq!(total, 5);
        }
        other => panic!("expected partial write, got {:?}", other),
    }
    assert_eq!(reconciler.remote().documents("items").len(), 3);

    reconciler.remote().fail_upserts_after(None);
    let report = reconciler.resolve_local_wins().unwrap();
    assert_eq!(report.skipped, 3);
    assert_eq!(report.storage_pushed, 2);
    assert_eq!(reconciler.stats().records_pushed, 5);
    assert!(reconciler.sync().unwrap().is_identical());
}

#[test]
fn push_cursor_survives_restart() {
    let test = TestInventory::file();
    for name in ["Drill", "Saw", "Tape"] {
        test.add::<StorageRecord>(StorageDraft::new(name, "ShelfA", 1))
            .unwrap();
    }
    let cursors: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
    let remote = Arc::new(MockRemote::new());
    remote.fail_upserts_after(Some(1));

    {
        let first = Reconciler::new(SyncConfig::default(), Arc::clone(&remote), test.shared())
            .with_cursor_store(Arc::clone(&cursors))
            .unwrap();
        assert!(first.resolve_local_wins().is_err());
    }

    let test = test.reopen();
    remote.fail_upserts_after(None);
    let second = Reconciler::new(SyncConfig::default(), Arc::clone(&remote), test.shared())
        .with_cursor_store(Arc::clone(&cursors))
        .unwrap();
    assert_eq!(second.pending_push().map(|c| c.storage_done), Some(1));

    let report = second.resolve_local_wins().unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.storage_pushed, 2);
    assert_eq!(remote.upsert_count(), 3);
    assert!(cursors.get("pushCursor.json").unwrap().is_none());
}

#[test]
fn blob_remote_over_directory() {
    let remote_dir = TempDir::new().unwrap();
    let remote_blobs: Arc<dyn BlobStore> =
        Arc::new(DirectoryBlobStore::open(remote_dir.path()).unwrap());

    let first = scenarios::workshop();
    let reconciler = Reconciler::new(
        SyncConfig::default(),
        BlobRemote::new(Arc::clone(&remote_blobs)),
        first.shared(),
    );
    assert!(!reconciler.sync().unwrap().is_identical());
    reconciler.resolve_local_wins().unwrap();
    assert!(remote_dir.path().join("items.json").exists());
    assert!(remote_dir.path().join("takenOutItems.json").exists());

    // A second, empty device pulls the shared copy.
    let second = TestInventory::memory();
    let peer = Reconciler::new(
        SyncConfig::default(),
        BlobRemote::new(Arc::clone(&remote_blobs)),
        second.shared(),
    );
    let SyncOutcome::Divergent { remote, report } = peer.sync().unwrap() else {
        panic!("empty device should diverge");
    };
    assert_eq!(report.storage.only_remote.len(), 3);
    peer.resolve_remote_wins(remote).unwrap();

    assert_eq!(
        second.list::<StorageRecord>().unwrap(),
        first.list::<StorageRecord>().unwrap()
    );
    assert_eq!(
        second.total_quantity("Hammer", "ShelfB").unwrap(),
        first.total_quantity("Hammer", "ShelfB").unwrap()
    );
    assert!(peer.sync().unwrap().is_identical());
}

#[test]
fn custom_collection_names() {
    let test = scenarios::workshop();
    let remote = MockRemote::new();
    let config = SyncConfig::default().with_collections("stock", "out");
    let reconciler = Reconciler::new(config, remote, test.shared());

    reconciler.resolve_local_wins().unwrap();
    assert_eq!(reconciler.remote().documents("stock").len(), 3);
    assert_eq!(reconciler.remote().documents("out").len(), 1);
    assert!(reconciler.remote().documents("items").is_empty());
}

#[test]
fn strict_remote_wins_rolls_back_on_write_failure() {
    let test = TestInventory::memory_with(InventoryConfig::default().strict_persistence(true));
    test.add::<StorageRecord>(StorageDraft::new("Drill", "ShelfA", 3))
        .unwrap();
    let remote = MockRemote::new();
    remote.set_documents("items", vec![doc(json!({"id": "r", "name": "Saw"}))]);
    let reconciler = reconciler(&test, remote);

    let SyncOutcome::Divergent { remote, .. } = reconciler.sync().unwrap() else {
        panic!("expected divergence");
    };
    test.memory_blobs().unwrap().set_fail_writes(true);
    let err = reconciler.resolve_remote_wins(remote).unwrap_err();
    assert!(matches!(err, SyncError::Core(ref core) if core.is_persistence_failure()));

    test.memory_blobs().unwrap().set_fail_writes(false);
    let storage = test.list::<StorageRecord>().unwrap();
    assert_eq!(storage.len(), 1);
    assert_eq!(storage[0].name, "Drill");
}

#[tokio::test]
async fn service_resolves_through_blob_remote() {
    let remote_dir = TempDir::new().unwrap();
    let remote_blobs: Arc<dyn BlobStore> =
        Arc::new(DirectoryBlobStore::open(remote_dir.path()).unwrap());
    let test = scenarios::workshop();
    let service = InventoryService::new(Reconciler::new(
        SyncConfig::default(),
        BlobRemote::new(remote_blobs),
        test.shared(),
    ));

    let outcome = service.sync().await.unwrap();
    assert!(!outcome.is_identical());
    service.resolve_local_wins().await.unwrap();
    assert!(service.sync().await.unwrap().is_identical());
    assert!(service.reconciler().remote().is_connected());
}
