//! CLI command implementations.

pub mod records;
pub mod sync;
pub mod transfer;

use clap::ValueEnum;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use stockroom_core::{Inventory, InventoryConfig, StorageRecord, TakenOutRecord};
use stockroom_storage::{BlobStore, DirectoryBlobStore, InMemoryBlobStore};
use stockroom_sync_engine::{BlobRemote, InventoryService, Reconciler, SyncConfig};

/// Result type shared by all commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// The service every command talks to.
pub type Service = InventoryService<BlobRemote>;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Opens the inventory in `data_dir` and wires it to the remote in
/// `remote_dir`.
///
/// Without a remote directory the service gets a detached in-memory remote;
/// only `sync` needs a real one and it checks for it first. Unfinished push
/// cursors are kept next to the local documents.
pub fn open_service(data_dir: &Path, remote_dir: Option<&Path>) -> CliResult<Service> {
    let local: Arc<dyn BlobStore> = Arc::new(DirectoryBlobStore::open(data_dir)?);
    let inventory = Inventory::open_with_blobs(Arc::clone(&local), InventoryConfig::default())?;

    let remote: Arc<dyn BlobStore> = match remote_dir {
        Some(dir) => Arc::new(DirectoryBlobStore::open(dir)?),
        None => Arc::new(InMemoryBlobStore::new()),
    };

    let reconciler = Reconciler::new(
        SyncConfig::default(),
        BlobRemote::new(remote),
        Arc::new(inventory),
    )
    .with_cursor_store(local)?;

    Ok(InventoryService::new(reconciler))
}

/// Prints `value` as JSON, or runs `text` for the text format.
pub fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T),
) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

/// One-line text rendering of a record.
pub trait Row {
    /// Formats the record as a table row.
    fn row(&self) -> String;
}

impl Row for StorageRecord {
    fn row(&self) -> String {
        let mut line = format!(
            "{:<38} {:<20} {:<16} {:>5}",
            self.id.as_str(),
            self.name,
            self.location,
            self.quantity
        );
        if !self.notes.is_empty() {
            line.push_str("  # ");
            line.push_str(&self.notes);
        }
        line
    }
}

impl Row for TakenOutRecord {
    fn row(&self) -> String {
        let mut line = format!(
            "{:<38} {:<20} {:<16} {:>5}",
            self.id.as_str(),
            self.name,
            format!("(from {})", self.original_location),
            self.quantity
        );
        if !self.notes.is_empty() {
            line.push_str("  # ");
            line.push_str(&self.notes);
        }
        line
    }
}

/// Prints records one per line, or a note when there are none.
pub fn print_rows<R: Row>(records: &[R]) {
    if records.is_empty() {
        println!("(no records)");
        return;
    }
    for record in records {
        println!("{}", record.row());
    }
}
