use super::sanitize::{read_id, read_quantity, read_text};
use super::{Document, IdGenerator, Record, RecordId};
use crate::types::RecordKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stock-keeping entry at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    /// Unique id.
    pub id: RecordId,
    /// Item name.
    pub name: String,
    /// Where the item is stored.
    pub location: String,
    /// How many are in storage.
    pub quantity: u32,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

/// Fields for adding a storage record; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageDraft {
    /// Item name.
    pub name: String,
    /// Where the item is stored.
    pub location: String,
    /// How many are in storage.
    pub quantity: u32,
    /// Free-form notes.
    pub notes: String,
}

impl StorageDraft {
    /// Creates a draft with empty notes.
    pub fn new(name: impl Into<String>, location: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            quantity,
            notes: String::new(),
        }
    }

    /// Sets the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

impl Record for StorageRecord {
    type Draft = StorageDraft;

    const KIND: RecordKind = RecordKind::Storage;

    fn from_draft(id: RecordId, draft: StorageDraft) -> Self {
        Self {
            id,
            name: draft.name,
            location: draft.location,
            quantity: draft.quantity,
            notes: draft.notes,
        }
    }

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn notes(&self) -> &str {
        &self.notes
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn sanitize(doc: &Document, ids: &dyn IdGenerator) -> Self {
        Self {
            id: read_id(doc, ids),
            name: read_text(doc, "name"),
            location: read_text(doc, "location"),
            quantity: read_quantity(doc),
            notes: read_text(doc, "notes"),
        }
    }

    fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("id".into(), Value::String(self.id.to_string()));
        doc.insert("name".into(), Value::String(self.name.clone()));
        doc.insert("location".into(), Value::String(self.location.clone()));
        doc.insert("quantity".into(), Value::from(self.quantity));
        doc.insert("notes".into(), Value::String(self.notes.clone()));
        doc
    }
}
