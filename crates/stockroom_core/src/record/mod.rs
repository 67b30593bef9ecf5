//! Record types, identifiers and sanitization.
//!
//! A record is one entry in a record store. Both kinds share the [`Record`]
//! trait so stores, filters and snapshot comparison are written once.

mod id;
mod sanitize;
mod storage;
mod taken_out;

pub use id::{IdGenerator, RecordId, SequentialGenerator, UuidGenerator};
pub use storage::{StorageDraft, StorageRecord};
pub use taken_out::{TakenOutDraft, TakenOutRecord};

use crate::error::CoreResult;
use crate::types::RecordKind;
use serde::Serialize;
use std::fmt;

/// An untyped key/value document as exchanged with the remote collection.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Behaviour shared by storage and taken-out records.
pub trait Record: Clone + PartialEq + fmt::Debug + Serialize + Send + Sync + 'static {
    /// The caller-supplied fields of a record, everything except the id.
    type Draft: Clone + fmt::Debug + Send + 'static;

    /// Which store this record lives in.
    const KIND: RecordKind;

    /// Builds a record from a draft and an assigned id.
    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;

    /// The record id.
    fn id(&self) -> &RecordId;

    /// Replaces the record id.
    fn set_id(&mut self, id: RecordId);

    /// The item name.
    fn name(&self) -> &str;

    /// The location used for filtering and slot matching
    /// (`location` or `originalLocation`).
    fn location(&self) -> &str;

    /// Free-form notes.
    fn notes(&self) -> &str;

    /// The quantity held by this record.
    fn quantity(&self) -> u32;

    /// Checks the record-level invariants of this kind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidRecord`] if an invariant is violated.
    fn validate(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Builds a complete record from a possibly incomplete document.
    ///
    /// Never fails: missing or invalid fields get their defaults and a
    /// missing id gets a fresh one from `ids`.
    fn sanitize(doc: &Document, ids: &dyn IdGenerator) -> Self;

    /// Renders the record as a document with every field present.
    fn to_document(&self) -> Document;

    /// Returns a copy with defaults applied, as written to the remote.
    fn sanitized(&self, ids: &dyn IdGenerator) -> Self {
        Self::sanitize(&self.to_document(), ids)
    }

    /// Returns true if both records denote the same stock slot
    /// (exact, case-sensitive name and location match).
    fn same_slot(&self, name: &str, location: &str) -> bool {
        self.name() == name && self.location() == location
    }
}
