//! Snapshot equality between two copies of one record kind.
//!
//! A snapshot is the full, order-irrelevant set of records of one kind. Two
//! snapshots are identical when they have the same cardinality and every
//! record on one side has a record on the other side with the same id and
//! equal fields. Everything else is a divergence; additions on either side
//! are never treated as a compatible superset.
//!
//! Comparison is a pure function with no I/O.

use crate::record::{Record, RecordId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// How two snapshots of one kind differ.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    /// Number of local records.
    pub local_len: usize,
    /// Number of remote records.
    pub remote_len: usize,
    /// Ids present only locally.
    pub only_local: Vec<RecordId>,
    /// Ids present only remotely.
    pub only_remote: Vec<RecordId>,
    /// Ids present on both sides with differing fields.
    pub changed: Vec<RecordId>,
    /// Ids occurring more than once on either side.
    pub duplicate_ids: Vec<RecordId>,
}

impl SnapshotDiff {
    /// Returns true if the snapshots are identical.
    pub fn is_identical(&self) -> bool {
        self.local_len == self.remote_len
            && self.only_local.is_empty()
            && self.only_remote.is_empty()
            && self.changed.is_empty()
            && self.duplicate_ids.is_empty()
    }

    /// Returns the number of distinct ids that differ in any way.
    pub fn divergent_count(&self) -> usize {
        self.only_local.len() + self.only_remote.len() + self.changed.len()
    }
}

/// Compares a local snapshot with a remote one.
///
/// Output id lists are sorted, so the result does not depend on input order.
pub fn compare<R: Record>(local: &[R], remote: &[R]) -> SnapshotDiff {
    let mut duplicates = BTreeSet::new();
    let local_by_id = index_by_id(local, &mut duplicates);
    let remote_by_id = index_by_id(remote, &mut duplicates);

    let mut only_local = Vec::new();
    let mut changed = Vec::new();
    for (id, local_record) in &local_by_id {
        match remote_by_id.get(id) {
            None => only_local.push((*id).clone()),
            Some(remote_record) if remote_record != local_record => changed.push((*id).clone()),
            Some(_) => {}
        }
    }

    let mut only_remote: Vec<RecordId> = remote_by_id
        .keys()
        .filter(|id| !local_by_id.contains_key(*id))
        .map(|id| (*id).clone())
        .collect();

    only_local.sort();
    only_remote.sort();
    changed.sort();

    SnapshotDiff {
        local_len: local.len(),
        remote_len: remote.len(),
        only_local,
        only_remote,
        changed,
        duplicate_ids: duplicates.into_iter().collect(),
    }
}

/// Returns true if the two snapshots are identical.
pub fn snapshots_equal<R: Record>(local: &[R], remote: &[R]) -> bool {
    compare(local, remote).is_identical()
}

fn index_by_id<'a, R: Record>(
    records: &'a [R],
    duplicates: &mut BTreeSet<RecordId>,
) -> HashMap<&'a RecordId, &'a R> {
    let mut by_id = HashMap::with_capacity(records.len());
    for record in records {
        if by_id.insert(record.id(), record).is_some() {
            duplicates.insert(record.id().clone());
        }
    }
    by_id
}
