//! # Stockroom Sync Engine
//!
//! Compares a local inventory with a remote peer copy and resolves
//! divergence in the direction a human chooses.
//!
//! This crate provides:
//! - The [`RemoteCollection`] abstraction, with blob-store, HTTP and mock
//!   implementations
//! - The [`Reconciler`]: read-only sync, local-wins push, remote-wins
//!   overwrite
//! - Resumable local-wins pushes via a persisted [`PushCursor`]
//! - [`InventoryService`], an async surface running blocking work on
//!   tokio's blocking pool
//!
//! ## Sync model
//!
//! 1. `sync` fetches both remote collections, sanitizes them and compares
//!    them with the local snapshot. Nothing is written.
//! 2. If the copies differ the caller picks a direction:
//!    - local wins: every local record is upserted to the remote
//!    - remote wins: both local stores are replaced with the remote snapshot
//!
//! ## Key Invariants
//!
//! - Nothing is written on either side without an explicit resolution
//! - Resolutions hold the inventory lock, so no transfer interleaves
//! - Local-wins never deletes remote-only records
//! - Failures are reported, never retried automatically

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blob_remote;
mod config;
mod error;
mod http;
mod reconciler;
mod remote;
mod service;

pub use blob_remote::BlobRemote;
pub use config::{RetryConfig, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpRemote};
pub use reconciler::{
    PushCursor, PushReport, Reconciler, RemoteSnapshot, SyncOutcome, SyncReport, SyncState,
    SyncStats,
};
pub use remote::{MockRemote, RemoteCollection};
pub use service::InventoryService;
