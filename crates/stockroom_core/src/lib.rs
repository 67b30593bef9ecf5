//! # Stockroom Core
//!
//! Inventory state model for Stockroom.
//!
//! This crate provides:
//! - Storage and taken-out record types with sanitize-on-read
//! - Record stores with explicit load/persist over a blob store
//! - The transfer engine (unit-granular move-out and return)
//! - Predicate filtering and location listing
//! - Snapshot comparison used by the reconciler
//! - The [`Inventory`] facade serializing every entry point
//!
//! ## Key Invariants
//!
//! - For every `(name, location)` slot, storage quantity plus matching
//!   taken-out quantities is unchanged by transfers
//! - A taken-out record always holds a quantity of at least 1
//! - A failed operation leaves both stores unchanged
//! - One mutation, including its persist, completes before the next starts

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod inventory;
mod query;
mod record;
mod snapshot;
mod store;
mod transfer;
mod types;

pub use config::InventoryConfig;
pub use error::{CoreError, CoreResult};
pub use inventory::{Inventory, InventoryGuard, InventoryRecord};
pub use query::{distinct_locations, RecordFilter};
pub use record::{
    Document, IdGenerator, Record, RecordId, SequentialGenerator, StorageDraft, StorageRecord,
    TakenOutDraft, TakenOutRecord, UuidGenerator,
};
pub use snapshot::{compare, snapshots_equal, SnapshotDiff};
pub use store::RecordStore;
pub use transfer::{slot_total, ReturnOutcome, TransferEngine};
pub use types::RecordKind;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
