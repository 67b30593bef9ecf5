//! # Stockroom Testkit
//!
//! Test utilities for Stockroom.
//!
//! This crate provides:
//! - Test fixtures and inventory helpers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use stockroom_core::{StorageDraft, StorageRecord};
//! use stockroom_testkit::prelude::*;
//!
//! let test = TestInventory::memory();
//! let drill: StorageRecord = test.add(StorageDraft::new("Drill", "ShelfA", 1)).unwrap();
//! test.move_out(&drill.id).unwrap();
//! assert_eq!(test.total_quantity("Drill", "ShelfA").unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
