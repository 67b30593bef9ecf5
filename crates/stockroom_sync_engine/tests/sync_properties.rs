//! Property tests for resolution convergence.

use proptest::prelude::*;
use stockroom_core::{Record, StorageDraft, StorageRecord};
use stockroom_sync_engine::{MockRemote, Reconciler, SyncConfig, SyncOutcome};
use stockroom_testkit::prelude::*;

fn seeded(drafts: Vec<StorageDraft>, remote: &[StorageRecord]) -> (TestInventory, MockRemote) {
    let test = TestInventory::memory();
    for draft in drafts {
        test.add::<StorageRecord>(draft).unwrap();
    }
    let mock = MockRemote::new();
    mock.set_documents("items", remote.iter().map(Record::to_document).collect());
    (test, mock)
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn local_wins_leaves_only_remote_extras(
        drafts in prop::collection::vec(storage_draft_strategy(), 0..6),
        remote in storage_snapshot_strategy(5),
    ) {
        let (test, mock) = seeded(drafts, &remote);
        let reconciler = Reconciler::new(SyncConfig::default(), mock, test.shared());

        reconciler.resolve_local_wins().unwrap();

        match reconciler.sync().unwrap() {
            SyncOutcome::Identical => prop_assert!(remote.is_empty()),
            SyncOutcome::Divergent { report, .. } => {
                prop_assert!(report.storage.only_local.is_empty());
                prop_assert!(report.storage.changed.is_empty());
                prop_assert_eq!(report.storage.only_remote.len(), remote.len());
            }
        }
    }

    #[test]
    fn remote_wins_converges(
        drafts in prop::collection::vec(storage_draft_strategy(), 0..6),
        remote in storage_snapshot_strategy(5),
    ) {
        let (test, mock) = seeded(drafts, &remote);
        let reconciler = Reconciler::new(SyncConfig::default(), mock, test.shared());

        if let SyncOutcome::Divergent { remote: snapshot, .. } = reconciler.sync().unwrap() {
            reconciler.resolve_remote_wins(snapshot).unwrap();
        }

        prop_assert!(reconciler.sync().unwrap().is_identical());
        prop_assert_eq!(test.list::<StorageRecord>().unwrap(), remote);
    }
}
