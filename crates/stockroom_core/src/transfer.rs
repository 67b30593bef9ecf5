//! Transfer engine: unit-granular move-out and return between the two stores.
//!
//! For every `(name, location)` slot the sum of the storage quantity and the
//! matching taken-out quantities is conserved by [`TransferEngine::move_out`]
//! and [`TransferEngine::return_item`]. Both operations validate everything
//! before touching either store, so a failed call leaves both unchanged.
//!
//! The engine mutates memory only; persisting both stores afterwards is the
//! caller's job (see [`crate::Inventory`]).

use crate::error::{CoreError, CoreResult};
use crate::record::{IdGenerator, Record, RecordId, StorageRecord, TakenOutRecord};
use crate::store::RecordStore;
use crate::types::RecordKind;
use serde::Serialize;
use tracing::debug;

/// What a successful return did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnOutcome {
    /// The storage record after the return.
    pub storage: StorageRecord,
    /// True if the storage record was created because no slot matched.
    pub created_storage: bool,
    /// Quantity left on the taken-out record; 0 means it was removed.
    pub remaining_out: u32,
}

/// Applies transfers across a storage store and a taken-out store.
pub struct TransferEngine<'a> {
    storage: &'a mut RecordStore<StorageRecord>,
    taken_out: &'a mut RecordStore<TakenOutRecord>,
    ids: &'a dyn IdGenerator,
}

impl<'a> TransferEngine<'a> {
    /// Creates an engine over the two stores.
    pub fn new(
        storage: &'a mut RecordStore<StorageRecord>,
        taken_out: &'a mut RecordStore<TakenOutRecord>,
        ids: &'a dyn IdGenerator,
    ) -> Self {
        Self {
            storage,
            taken_out,
            ids,
        }
    }

    /// Moves one unit of a storage record out.
    ///
    /// Decrements the storage quantity by exactly 1 and creates a taken-out
    /// record with quantity 1 carrying the name, notes and location.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if no storage record has `storage_id`
    /// - [`CoreError::InsufficientQuantity`] if its quantity is already 0
    pub fn move_out(&mut self, storage_id: &RecordId) -> CoreResult<TakenOutRecord> {
        let source = self
            .storage
            .get(storage_id)
            .ok_or_else(|| CoreError::not_found(RecordKind::Storage, storage_id))?;

        if source.quantity == 0 {
            return Err(CoreError::InsufficientQuantity {
                id: storage_id.clone(),
            });
        }

        let taken = TakenOutRecord {
            id: self.taken_out.fresh_id(self.ids),
            name: source.name.clone(),
            original_location: source.location.clone(),
            quantity: 1,
            notes: source.notes.clone(),
        };

        if let Some(source) = self.storage.get_mut(storage_id) {
            source.quantity -= 1;
        }
        self.taken_out.push(taken.clone());

        debug!(
            storage_id = %storage_id,
            taken_out_id = %taken.id,
            name = %taken.name,
            "moved one unit out of storage"
        );
        Ok(taken)
    }

    /// Returns one unit of a taken-out record to storage.
    ///
    /// Decrements the taken-out quantity by 1, removing the record when it
    /// reaches 0. The unit goes to the first storage record in the same slot
    /// (`name` and `location == original_location`); if there is none, a new
    /// storage record with quantity 1 is created at the original location.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if no taken-out record has `taken_out_id`
    /// - [`CoreError::InvalidRecord`] if the taken-out record holds no units
    /// - [`CoreError::QuantityOverflow`] if the matching storage record is full
    pub fn return_item(&mut self, taken_out_id: &RecordId) -> CoreResult<ReturnOutcome> {
        let out_index = self
            .taken_out
            .position(taken_out_id)
            .ok_or_else(|| CoreError::not_found(RecordKind::TakenOut, taken_out_id))?;

        let out = self.taken_out.list()[out_index].clone();
        out.validate()?;
        let slot = self.storage.find_slot(&out.name, &out.original_location);

        if let Some(index) = slot {
            let target = &self.storage.list()[index];
            if target.quantity == u32::MAX {
                return Err(CoreError::QuantityOverflow {
                    id: target.id.clone(),
                });
            }
        }

        let remaining_out = out.quantity - 1;
        if remaining_out == 0 {
            self.taken_out.remove_at(out_index);
        } else {
            self.taken_out.record_at_mut(out_index).quantity = remaining_out;
        }

        let (storage, created_storage) = match slot {
            Some(index) => {
                let target = self.storage.record_at_mut(index);
                target.quantity += 1;
                (target.clone(), false)
            }
            None => {
                let created = StorageRecord {
                    id: self.storage.fresh_id(self.ids),
                    name: out.name.clone(),
                    location: out.original_location.clone(),
                    quantity: 1,
                    notes: out.notes.clone(),
                };
                self.storage.push(created.clone());
                (created, true)
            }
        };

        debug!(
            taken_out_id = %taken_out_id,
            storage_id = %storage.id,
            created_storage,
            remaining_out,
            "returned one unit to storage"
        );
        Ok(ReturnOutcome {
            storage,
            created_storage,
            remaining_out,
        })
    }
}

/// Total units of a slot: storage quantity plus matching taken-out quantities.
///
/// This is the quantity that transfers conserve.
pub fn slot_total(
    storage: &RecordStore<StorageRecord>,
    taken_out: &RecordStore<TakenOutRecord>,
    name: &str,
    location: &str,
) -> u64 {
    let stored: u64 = storage
        .list()
        .iter()
        .filter(|r| r.same_slot(name, location))
        .map(|r| u64::from(r.quantity))
        .sum();
    let out: u64 = taken_out
        .list()
        .iter()
        .filter(|r| r.same_slot(name, location))
        .map(|r| u64::from(r.quantity))
        .sum();
    stored + out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SequentialGenerator, StorageDraft, TakenOutDraft};
    use std::sync::Arc;
    use stockroom_storage::InMemoryBlobStore;

    struct Fixture {
        storage: RecordStore<StorageRecord>,
        taken_out: RecordStore<TakenOutRecord>,
        ids: SequentialGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            let blobs = Arc::new(InMemoryBlobStore::new());
            Self {
                storage: RecordStore::new(blobs.clone(), "items.json"),
                taken_out: RecordStore::new(blobs, "takenOutItems.json"),
                ids: SequentialGenerator::new("id-"),
            }
        }

        fn add(&mut self, name: &str, location: &str, quantity: u32) -> StorageRecord {
            self.storage
                .add(StorageDraft::new(name, location, quantity), &self.ids)
                .unwrap()
        }

        fn engine(&mut self) -> TransferEngine<'_> {
            TransferEngine::new(&mut self.storage, &mut self.taken_out, &self.ids)
        }
    }

    #[test]
    fn drill_scenario() {
        let mut fx = Fixture::new();
        let drill = fx.add("Drill", "ShelfA", 3);

        let taken = fx.engine().move_out(&drill.id).unwrap();
        assert_eq!(fx.storage.get(&drill.id).unwrap().quantity, 2);
        assert_eq!(taken.name, "Drill");
        assert_eq!(taken.original_location, "ShelfA");
        assert_eq!(taken.quantity, 1);
        assert_eq!(fx.taken_out.len(), 1);

        let outcome = fx.engine().return_item(&taken.id).unwrap();
        assert!(!outcome.created_storage);
        assert_eq!(outcome.remaining_out, 0);
        assert!(fx.taken_out.is_empty());
        assert_eq!(fx.storage.get(&drill.id).unwrap().quantity, 3);
    }

    #[test]
    fn move_out_copies_notes() {
        let mut fx = Fixture::new();
        let record = fx
            .storage
            .add(StorageDraft::new("Saw", "Wall", 1).with_notes("sharp"), &fx.ids)
            .unwrap();
        let taken = fx.engine().move_out(&record.id).unwrap();
        assert_eq!(taken.notes, "sharp");
    }

    #[test]
    fn move_out_zero_quantity_changes_nothing() {
        let mut fx = Fixture::new();
        let empty = fx.add("Glue", "Bin", 0);
        let before = fx.storage.snapshot();

        let err = fx.engine().move_out(&empty.id).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientQuantity { .. }));
        assert_eq!(fx.storage.snapshot(), before);
        assert!(fx.taken_out.is_empty());
    }

    #[test]
    fn move_out_unknown_id() {
        let mut fx = Fixture::new();
        let err = fx.engine().move_out(&RecordId::new("nope")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                kind: RecordKind::Storage,
                ..
            }
        ));
    }

    #[test]
    fn return_unknown_id() {
        let mut fx = Fixture::new();
        let err = fx.engine().return_item(&RecordId::new("nope")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                kind: RecordKind::TakenOut,
                ..
            }
        ));
    }

    #[test]
    fn return_after_storage_deleted_creates_record() {
        let mut fx = Fixture::new();
        let drill = fx.add("Drill", "ShelfA", 1);
        let taken = fx.engine().move_out(&drill.id).unwrap();
        fx.storage.delete(&drill.id);

        let outcome = fx.engine().return_item(&taken.id).unwrap();
        assert!(outcome.created_storage);
        assert_eq!(outcome.storage.quantity, 1);
        assert_eq!(outcome.storage.location, "ShelfA");
        assert_ne!(outcome.storage.id, drill.id);
        assert_eq!(fx.storage.len(), 1);
    }

    #[test]
    fn return_decrements_multi_unit_record() {
        let mut fx = Fixture::new();
        let stock = fx.add("Cable", "Crate", 0);
        let out = fx
            .taken_out
            .add(TakenOutDraft::new("Cable", "Crate", 3), &fx.ids)
            .unwrap();

        let outcome = fx.engine().return_item(&out.id).unwrap();
        assert_eq!(outcome.remaining_out, 2);
        assert_eq!(fx.taken_out.get(&out.id).unwrap().quantity, 2);
        assert_eq!(fx.storage.get(&stock.id).unwrap().quantity, 1);
    }

    #[test]
    fn return_of_empty_record_changes_nothing() {
        let mut fx = Fixture::new();
        fx.add("Drill", "ShelfA", 0);
        let empty = TakenOutRecord::from_draft(
            RecordId::new("t0"),
            TakenOutDraft::new("Drill", "ShelfA", 0),
        );
        fx.taken_out.push(empty.clone());
        let before = slot_total(&fx.storage, &fx.taken_out, "Drill", "ShelfA");

        let err = fx.engine().return_item(&empty.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidRecord {
                kind: RecordKind::TakenOut,
                ..
            }
        ));
        assert_eq!(fx.taken_out.list(), &[empty][..]);
        assert_eq!(slot_total(&fx.storage, &fx.taken_out, "Drill", "ShelfA"), before);
    }

    #[test]
    fn return_overflow_changes_nothing() {
        let mut fx = Fixture::new();
        let full = fx.add("Screw", "Jar", u32::MAX);
        let out = fx
            .taken_out
            .add(TakenOutDraft::new("Screw", "Jar", 1), &fx.ids)
            .unwrap();

        let err = fx.engine().return_item(&out.id).unwrap_err();
        assert!(matches!(err, CoreError::QuantityOverflow { .. }));
        assert_eq!(fx.storage.get(&full.id).unwrap().quantity, u32::MAX);
        assert_eq!(fx.taken_out.len(), 1);
    }

    #[test]
    fn slot_total_is_conserved() {
        let mut fx = Fixture::new();
        let drill = fx.add("Drill", "ShelfA", 4);
        fx.add("Drill", "ShelfB", 9);
        let before = slot_total(&fx.storage, &fx.taken_out, "Drill", "ShelfA");

        let a = fx.engine().move_out(&drill.id).unwrap();
        let _b = fx.engine().move_out(&drill.id).unwrap();
        assert_eq!(slot_total(&fx.storage, &fx.taken_out, "Drill", "ShelfA"), before);

        fx.engine().return_item(&a.id).unwrap();
        assert_eq!(slot_total(&fx.storage, &fx.taken_out, "Drill", "ShelfA"), before);
        assert_eq!(before, 4);
    }
}
