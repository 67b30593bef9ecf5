//! Reconciler: divergence detection and user-directed resolution.
//!
//! [`Reconciler::sync`] compares the local inventory with the remote copy and
//! never mutates either side. On divergence the caller (a human) picks a
//! direction:
//!
//! - [`Reconciler::resolve_local_wins`] upserts every local record to the
//!   remote, one at a time, in order. A failure stops the loop; a retry
//!   against the unchanged local snapshot resumes after the last record that
//!   was written.
//! - [`Reconciler::resolve_remote_wins`] overwrites both local stores with
//!   the remote snapshot returned by the preceding sync.
//!
//! Both resolutions hold the inventory lock for their whole duration, so no
//! transfer runs in between.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteCollection;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use stockroom_core::{
    compare, IdGenerator, Inventory, InventoryRecord, Record, RecordKind, SnapshotDiff,
    StorageRecord, TakenOutRecord,
};
use stockroom_storage::BlobStore;
use tracing::{debug, info, warn};

/// The current state of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    /// No sync has run yet, or the last resolution finished.
    Idle,
    /// Fetching the remote snapshot.
    Fetching,
    /// Pushing local records to the remote.
    Pushing,
    /// Replacing local records with the remote snapshot.
    Replacing,
    /// The last sync found both copies identical.
    Identical,
    /// The last sync found the copies divergent.
    Divergent,
    /// The last operation failed.
    Error,
}

impl SyncState {
    /// Returns true if an operation is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Fetching | SyncState::Pushing | SyncState::Replacing
        )
    }

    /// Returns true if a new operation can start.
    pub fn can_start_sync(&self) -> bool {
        !self.is_active()
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Number of completed syncs (comparisons).
    pub syncs_completed: u64,
    /// Number of syncs that found divergence.
    pub divergences_detected: u64,
    /// Records upserted to the remote.
    pub records_pushed: u64,
    /// Records skipped because a resumed push had already written them.
    pub records_skipped: u64,
    /// Records written locally by remote-wins resolutions.
    pub records_replaced: u64,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// A sanitized remote copy of both record kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteSnapshot {
    /// Remote storage records.
    pub storage: Vec<StorageRecord>,
    /// Remote taken-out records.
    pub taken_out: Vec<TakenOutRecord>,
}

impl RemoteSnapshot {
    /// Returns the total number of records.
    pub fn len(&self) -> usize {
        self.storage.len() + self.taken_out.len()
    }

    /// Returns true if both kinds are empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty() && self.taken_out.is_empty()
    }
}

/// Per-kind differences found by a sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Storage-item differences.
    pub storage: SnapshotDiff,
    /// Taken-out-item differences.
    pub taken_out: SnapshotDiff,
}

impl SyncReport {
    /// Returns true if both kinds are identical.
    pub fn is_identical(&self) -> bool {
        self.storage.is_identical() && self.taken_out.is_identical()
    }
}

/// Classification returned by [`Reconciler::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local and remote hold the same records.
    Identical,
    /// The copies disagree; a human must choose a direction.
    Divergent {
        /// The remote snapshot, for a later remote-wins resolution.
        remote: RemoteSnapshot,
        /// What differs.
        report: SyncReport,
    },
}

impl SyncOutcome {
    /// Returns true if the outcome is [`SyncOutcome::Identical`].
    pub fn is_identical(&self) -> bool {
        matches!(self, SyncOutcome::Identical)
    }
}

/// Progress of a local-wins push, kept so a retry can skip finished work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushCursor {
    /// SHA-256 of the local snapshot being pushed, hex encoded.
    pub fingerprint: String,
    /// Storage records already upserted, in snapshot order.
    pub storage_done: usize,
    /// Taken-out records already upserted, in snapshot order.
    pub taken_out_done: usize,
    /// When the cursor was last advanced (Unix millis).
    pub updated_at: u64,
}

/// Result of a completed local-wins push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    /// Storage records upserted by this call.
    pub storage_pushed: usize,
    /// Taken-out records upserted by this call.
    pub taken_out_pushed: usize,
    /// Records skipped because an earlier attempt had written them.
    pub skipped: usize,
}

impl PushReport {
    /// Returns the number of records upserted by this call.
    pub fn pushed(&self) -> usize {
        self.storage_pushed + self.taken_out_pushed
    }
}

/// The reconciler compares and resolves an inventory against one remote.
pub struct Reconciler<R: RemoteCollection> {
    config: SyncConfig,
    remote: Arc<R>,
    inventory: Arc<Inventory>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cursor: Mutex<Option<PushCursor>>,
    cursor_store: Option<Arc<dyn BlobStore>>,
}

impl<R: RemoteCollection> Reconciler<R> {
    /// Creates a new reconciler.
    pub fn new(config: SyncConfig, remote: R, inventory: Arc<Inventory>) -> Self {
        Self {
            config,
            remote: Arc::new(remote),
            inventory,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cursor: Mutex::new(None),
            cursor_store: None,
        }
    }

    /// Persists unfinished push cursors in `blobs` so a later process can
    /// resume. A cursor already saved there is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved cursor cannot be read.
    pub fn with_cursor_store(mut self, blobs: Arc<dyn BlobStore>) -> SyncResult<Self> {
        let saved = blobs
            .get(&self.config.cursor_key)
            .map_err(stockroom_core::CoreError::from)?;

        if let Some(bytes) = saved {
            match serde_json::from_slice::<PushCursor>(&bytes) {
                Ok(cursor) => {
                    debug!(
                        storage_done = cursor.storage_done,
                        taken_out_done = cursor.taken_out_done,
                        "loaded saved push cursor"
                    );
                    *self.cursor.get_mut() = Some(cursor);
                }
                Err(e) => warn!(error = %e, "ignoring unreadable push cursor"),
            }
        }

        self.cursor_store = Some(blobs);
        Ok(self)
    }

    /// Returns the sync configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the remote collection.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Returns the inventory being reconciled.
    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the cursor of an unfinished push, if any.
    pub fn pending_push(&self) -> Option<PushCursor> {
        self.cursor.lock().clone()
    }

    /// Fetches the remote snapshot and compares it with the local one.
    ///
    /// Read-only on both sides.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unavailable`] if the remote cannot be read, and
    /// [`SyncError::InvalidStateTransition`] if another operation is running.
    pub fn sync(&self) -> SyncResult<SyncOutcome> {
        self.begin(SyncState::Fetching, "sync")?;

        let result = self.fetch_and_compare();
        match &result {
            Ok(outcome) => {
                let identical = outcome.is_identical();
                {
                    let mut stats = self.stats.write();
                    stats.syncs_completed += 1;
                    if !identical {
                        stats.divergences_detected += 1;
                    }
                    stats.last_sync_time = Some(Instant::now());
                    stats.last_error = None;
                }
                if identical {
                    info!("local and remote are identical");
                    self.set_state(SyncState::Identical);
                } else {
                    info!("local and remote have diverged");
                    self.set_state(SyncState::Divergent);
                }
            }
            Err(e) => self.handle_error(e),
        }
        result
    }

    /// Pushes every local record of both kinds to the remote.
    ///
    /// Records are sanitized and upserted in snapshot order, storage items
    /// first. Remote records with no local counterpart are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PartialWrite`] if an upsert fails; the remote
    /// keeps the records written so far and the push cursor remembers them.
    pub fn resolve_local_wins(&self) -> SyncResult<PushReport> {
        self.begin(SyncState::Pushing, "resolve-local-wins")?;

        let result = self.push_all();
        match &result {
            Ok(report) => {
                info!(
                    pushed = report.pushed(),
                    skipped = report.skipped,
                    "local-wins resolution finished"
                );
                self.set_state(SyncState::Idle);
            }
            Err(e) => self.handle_error(e),
        }
        result
    }

    /// Replaces both local stores with `remote` and persists them.
    ///
    /// This is a full overwrite: local records absent from `remote` are lost.
    /// Remote taken-out records holding no units are dropped, and a remote
    /// record reusing an earlier record's id gets a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Core`] if the inventory is closed, or if
    /// persisting fails in strict mode (local state is then rolled back).
    pub fn resolve_remote_wins(&self, remote: RemoteSnapshot) -> SyncResult<()> {
        self.begin(SyncState::Replacing, "resolve-remote-wins")?;

        let result = self.replace_local(remote);
        match &result {
            Ok(replaced) => {
                self.stats.write().records_replaced += *replaced as u64;
                info!(records = replaced, "remote-wins resolution finished");
                self.set_state(SyncState::Idle);
            }
            Err(e) => self.handle_error(e),
        }
        result.map(|_| ())
    }

    fn fetch_and_compare(&self) -> SyncResult<SyncOutcome> {
        let ids = self.inventory.id_generator();
        let (local_storage, local_taken_out) = {
            let guard = self.inventory.lock()?;
            (
                guard.snapshot::<StorageRecord>(),
                guard.snapshot::<TakenOutRecord>(),
            )
        };

        let remote = RemoteSnapshot {
            storage: self.fetch::<StorageRecord>(ids.as_ref())?,
            taken_out: self.fetch::<TakenOutRecord>(ids.as_ref())?,
        };

        let report = SyncReport {
            storage: compare(&local_storage, &remote.storage),
            taken_out: compare(&local_taken_out, &remote.taken_out),
        };
        debug!(
            storage_divergent = report.storage.divergent_count(),
            taken_out_divergent = report.taken_out.divergent_count(),
            "snapshots compared"
        );

        if report.is_identical() {
            Ok(SyncOutcome::Identical)
        } else {
            Ok(SyncOutcome::Divergent { remote, report })
        }
    }

    fn fetch<T: InventoryRecord>(&self, ids: &dyn IdGenerator) -> SyncResult<Vec<T>> {
        let collection = self.config.collection(T::KIND);
        let documents = self.remote.list_all(collection)?;
        debug!(collection, count = documents.len(), "fetched remote snapshot");
        Ok(documents.iter().map(|doc| T::sanitize(doc, ids)).collect())
    }

    fn push_all(&self) -> SyncResult<PushReport> {
        let guard = self.inventory.lock()?;
        let ids = guard.ids();

        let storage: Vec<StorageRecord> = guard
            .records::<StorageRecord>()
            .iter()
            .map(|r| r.sanitized(ids))
            .collect();
        let taken_out: Vec<TakenOutRecord> = guard
            .records::<TakenOutRecord>()
            .iter()
            .map(|r| r.sanitized(ids))
            .collect();

        let fingerprint = fingerprint(&storage, &taken_out)?;
        let mut cursor = match self.cursor.lock().clone() {
            Some(saved) if self.config.resume_partial_push && saved.fingerprint == fingerprint => {
                info!(
                    storage_done = saved.storage_done,
                    taken_out_done = saved.taken_out_done,
                    "resuming interrupted push"
                );
                saved
            }
            _ => PushCursor {
                fingerprint,
                storage_done: 0,
                taken_out_done: 0,
                updated_at: now_millis(),
            },
        };

        let skipped = cursor.storage_done.min(storage.len())
            + cursor.taken_out_done.min(taken_out.len());
        let mut report = PushReport {
            skipped,
            ..PushReport::default()
        };

        report.storage_pushed = self.push_kind(&storage, &mut cursor)?;
        report.taken_out_pushed = self.push_kind(&taken_out, &mut cursor)?;

        self.clear_cursor();
        {
            let mut stats = self.stats.write();
            stats.records_skipped += report.skipped as u64;
            stats.last_error = None;
        }
        drop(guard);
        Ok(report)
    }

    /// Upserts the records of one kind from the cursor position onward.
    fn push_kind<T: InventoryRecord>(
        &self,
        records: &[T],
        cursor: &mut PushCursor,
    ) -> SyncResult<usize> {
        let collection = self.config.collection(T::KIND);
        let start = done(cursor, T::KIND).min(records.len());
        let mut pushed = 0;

        for (index, record) in records.iter().enumerate().skip(start) {
            if let Err(e) = self
                .remote
                .upsert(collection, record.id(), &record.to_document())
            {
                warn!(
                    collection,
                    id = %record.id(),
                    completed = index,
                    total = records.len(),
                    error = %e,
                    "upsert failed, stopping push"
                );
                self.stats.write().records_pushed += pushed as u64;
                cursor.updated_at = now_millis();
                self.save_cursor(cursor);
                return Err(SyncError::PartialWrite {
                    collection: collection.to_string(),
                    completed: index,
                    total: records.len(),
                    message: e.to_string(),
                });
            }
            pushed += 1;
            set_done(cursor, T::KIND, index + 1);
        }

        self.stats.write().records_pushed += pushed as u64;
        Ok(pushed)
    }

    fn replace_local(&self, remote: RemoteSnapshot) -> SyncResult<usize> {
        let mut guard = self.inventory.lock()?;
        let ids = guard.ids();
        let storage: Vec<StorageRecord> =
            remote.storage.iter().map(|r| r.sanitized(ids)).collect();
        let taken_out: Vec<TakenOutRecord> =
            remote.taken_out.iter().map(|r| r.sanitized(ids)).collect();

        guard.replace_both(storage, taken_out)?;
        let replaced =
            guard.records::<StorageRecord>().len() + guard.records::<TakenOutRecord>().len();
        drop(guard);

        // The local snapshot changed, so any half-finished push is stale.
        self.clear_cursor();
        Ok(replaced)
    }

    fn save_cursor(&self, cursor: &PushCursor) {
        *self.cursor.lock() = Some(cursor.clone());

        let Some(store) = &self.cursor_store else {
            return;
        };
        let written = serde_json::to_vec(cursor)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                store
                    .put(&self.config.cursor_key, &bytes)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = written {
            warn!(error = %e, "failed to save push cursor");
        }
    }

    fn clear_cursor(&self) {
        *self.cursor.lock() = None;

        if let Some(store) = &self.cursor_store {
            if let Err(e) = store.remove(&self.config.cursor_key) {
                warn!(error = %e, "failed to remove push cursor");
            }
        }
    }

    /// Moves to `state` if no other operation is running.
    fn begin(&self, state: SyncState, operation: &str) -> SyncResult<()> {
        let mut current = self.state.write();
        if !current.can_start_sync() {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", *current),
                to: operation.to_string(),
            });
        }
        *current = state;
        Ok(())
    }

    /// Sets the state.
    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Handles an error by updating state and stats.
    fn handle_error(&self, error: &SyncError) {
        warn!(error = %error, "sync operation failed");
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}

impl<R: RemoteCollection> std::fmt::Debug for Reconciler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn done(cursor: &PushCursor, kind: RecordKind) -> usize {
    match kind {
        RecordKind::Storage => cursor.storage_done,
        RecordKind::TakenOut => cursor.taken_out_done,
    }
}

fn set_done(cursor: &mut PushCursor, kind: RecordKind, value: usize) {
    match kind {
        RecordKind::Storage => cursor.storage_done = value,
        RecordKind::TakenOut => cursor.taken_out_done = value,
    }
}

/// SHA-256 over the serialized snapshot, hex encoded.
fn fingerprint(storage: &[StorageRecord], taken_out: &[TakenOutRecord]) -> SyncResult<String> {
    let bytes =
        serde_json::to_vec(&(storage, taken_out)).map_err(|e| SyncError::Codec(e.to_string()))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
