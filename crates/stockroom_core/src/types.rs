//! Core type definitions for Stockroom.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of record Stockroom tracks.
///
/// Each kind lives in its own record store, its own persisted document and
/// its own remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    /// Items sitting in storage.
    Storage,
    /// Items currently taken out of storage.
    TakenOut,
}

impl RecordKind {
    /// Both kinds, in persistence and push order.
    pub const ALL: [RecordKind; 2] = [RecordKind::Storage, RecordKind::TakenOut];

    /// Default blob key of the local document for this kind.
    #[must_use]
    pub const fn default_document_key(self) -> &'static str {
        match self {
            RecordKind::Storage => "items.json",
            RecordKind::TakenOut => "takenOutItems.json",
        }
    }

    /// Default remote collection name for this kind.
    #[must_use]
    pub const fn default_collection(self) -> &'static str {
        match self {
            RecordKind::Storage => "items",
            RecordKind::TakenOut => "takenOutItems",
        }
    }

    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RecordKind::Storage => "storage",
            RecordKind::TakenOut => "taken-out",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
