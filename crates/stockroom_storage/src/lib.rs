//! # Stockroom Storage
//!
//! Key/value blob store trait and implementations for Stockroom.
//!
//! This crate provides the lowest-level persistence abstraction for Stockroom.
//! Blob stores are **opaque document stores** - they map a key to a byte
//! payload and do not interpret the data they store.
//!
//! ## Design Principles
//!
//! - Stores are simple keyed byte stores (get, put, remove)
//! - No knowledge of record types or the JSON document layout
//! - Must be `Send + Sync` so one store can back several record stores
//! - A `put` either replaces the whole blob or leaves the old one intact
//!
//! ## Available Backends
//!
//! - [`InMemoryBlobStore`] - For testing and ephemeral storage
//! - [`DirectoryBlobStore`] - One file per key inside a directory
//!
//! ## Example
//!
//! ```rust
//! use stockroom_storage::{BlobStore, InMemoryBlobStore};
//!
//! let store = InMemoryBlobStore::new();
//! store.put("items.json", b"[]").unwrap();
//! assert_eq!(store.get("items.json").unwrap().as_deref(), Some(&b"[]"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod memory;
mod store;

pub use directory::DirectoryBlobStore;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBlobStore;
pub use store::{validate_key, BlobStore};
