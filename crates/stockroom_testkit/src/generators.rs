//! Property-based test generators using proptest.
//!
//! Names and locations are drawn from small pools so generated records
//! collide on stock slots often enough to exercise slot matching.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};
use stockroom_core::{
    Document, Record, RecordId, StorageDraft, StorageRecord, TakenOutDraft, TakenOutRecord,
};

const NAMES: &[&str] = &["Drill", "Saw", "Hammer", "Tape", "drill", "Drill bits"];
const LOCATIONS: &[&str] = &["ShelfA", "ShelfB", "Drawer", "Wall", ""];

/// Strategy for generating item names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(NAMES).prop_map(str::to_string)
}

/// Strategy for generating locations, including the empty location.
pub fn location_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(LOCATIONS).prop_map(str::to_string)
}

/// Strategy for generating free-form notes.
pub fn notes_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        2 => Just(String::new()),
        1 => prop::string::string_regex("[a-z ]{1,16}").expect("Invalid regex"),
    ]
}

/// Strategy for generating opaque record ids.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    prop::string::string_regex("[a-z0-9]{1,12}")
        .expect("Invalid regex")
        .prop_map(RecordId::new)
}

/// Strategy for generating storage drafts with small quantities.
pub fn storage_draft_strategy() -> impl Strategy<Value = StorageDraft> {
    (name_strategy(), location_strategy(), 0u32..6, notes_strategy()).prop_map(
        |(name, location, quantity, notes)| {
            StorageDraft::new(name, location, quantity).with_notes(notes)
        },
    )
}

/// Strategy for generating taken-out drafts (quantity is always at least 1).
pub fn taken_out_draft_strategy() -> impl Strategy<Value = TakenOutDraft> {
    (name_strategy(), location_strategy(), 1u32..4, notes_strategy()).prop_map(
        |(name, location, quantity, notes)| {
            TakenOutDraft::new(name, location, quantity).with_notes(notes)
        },
    )
}

/// Strategy for generating complete storage records.
pub fn storage_record_strategy() -> impl Strategy<Value = StorageRecord> {
    (record_id_strategy(), storage_draft_strategy())
        .prop_map(|(id, draft)| StorageRecord::from_draft(id, draft))
}

/// Strategy for generating complete taken-out records.
pub fn taken_out_record_strategy() -> impl Strategy<Value = TakenOutRecord> {
    (record_id_strategy(), taken_out_draft_strategy())
        .prop_map(|(id, draft)| TakenOutRecord::from_draft(id, draft))
}

/// Strategy for generating a snapshot with unique ids.
pub fn storage_snapshot_strategy(max_len: usize) -> impl Strategy<Value = Vec<StorageRecord>> {
    prop::collection::vec(storage_draft_strategy(), 0..max_len).prop_map(|drafts| {
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| StorageRecord::from_draft(RecordId::new(format!("s{}", i)), draft))
            .collect()
    })
}

/// Strategy for generating arbitrary JSON scalars, as found in hand-edited
/// or legacy documents.
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        any::<f64>().prop_filter_map("finite", |f| Number::from_f64(f).map(Value::Number)),
        prop::string::string_regex("[a-zA-Z0-9 ]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::String),
    ]
}

/// Strategy for generating raw documents with any subset of record fields,
/// each holding any scalar.
pub fn raw_document_strategy() -> impl Strategy<Value = Document> {
    let fields = ["id", "name", "location", "originalLocation", "quantity", "notes"];
    prop::collection::vec(prop::option::of(json_scalar_strategy()), fields.len()).prop_map(
        move |values| {
            let mut doc = Map::new();
            for (key, value) in fields.iter().zip(values) {
                if let Some(value) = value {
                    doc.insert((*key).to_string(), value);
                }
            }
            doc
        },
    )
}

/// A transfer operation against a generated inventory.
///
/// Indices select a record modulo the current store length, so every
/// operation is applicable to whatever state the sequence has produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    /// Move one unit of the selected storage record out.
    MoveOut {
        /// Storage record selector.
        index: usize,
    },
    /// Return one unit of the selected taken-out record.
    Return {
        /// Taken-out record selector.
        index: usize,
    },
}

/// Strategy for generating transfer operations.
pub fn transfer_op_strategy() -> impl Strategy<Value = TransferOp> {
    prop_oneof![
        3 => any::<usize>().prop_map(|index| TransferOp::MoveOut { index }),
        2 => any::<usize>().prop_map(|index| TransferOp::Return { index }),
    ]
}

/// Strategy for generating a sequence of transfer operations.
pub fn transfer_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<TransferOp>> {
    prop::collection::vec(transfer_op_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
