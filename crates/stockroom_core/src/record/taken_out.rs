use super::sanitize::{read_id, read_quantity, read_text};
use super::{Document, IdGenerator, Record, RecordId};
use crate::error::{CoreError, CoreResult};
use crate::types::RecordKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A quantity of a named item currently outside storage.
///
/// `quantity` is at least 1 while the record exists; the transfer engine
/// removes a record whose quantity reaches 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakenOutRecord {
    /// Unique id.
    pub id: RecordId,
    /// Item name.
    pub name: String,
    /// The storage location the item came from.
    pub original_location: String,
    /// How many are out.
    pub quantity: u32,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

/// Fields for adding a taken-out record; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakenOutDraft {
    /// Item name.
    pub name: String,
    /// The storage location the item came from.
    pub original_location: String,
    /// How many are out.
    pub quantity: u32,
    /// Free-form notes.
    pub notes: String,
}

impl TakenOutDraft {
    /// Creates a draft with empty notes.
    pub fn new(
        name: impl Into<String>,
        original_location: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            original_location: original_location.into(),
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

impl Record for TakenOutRecord {
    type Draft = TakenOutDraft;

    const KIND: RecordKind = RecordKind::TakenOut;

    fn from_draft(id: RecordId, draft: TakenOutDraft) -> Self {
        Self {
            id,
            name: draft.name,
            original_location: draft.original_location,
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
        &self.original_location
    }

    fn notes(&self) -> &str {
        &self.notes
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn validate(&self) -> CoreResult<()> {
        if self.quantity == 0 {
            return Err(CoreError::invalid_record(
                Self::KIND,
                "quantity must be at least 1",
            ));
        }
        Ok(())
    }

    fn sanitize(doc: &Document, ids: &dyn IdGenerator) -> Self {
        Self {
            id: read_id(doc, ids),
            name: read_text(doc, "name"),
            original_location: read_text(doc, "originalLocation"),
            quantity: read_quantity(doc),
            notes: read_text(doc, "notes"),
        }
    }

    fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("id".into(), Value::String(self.id.to_string()));
        doc.insert("name".into(), Value::String(self.name.clone()));
        doc.insert(
            "originalLocation".into(),
            Value::String(self.original_location.clone()),
        );
        doc.insert("quantity".into(), Value::from(self.quantity));
        doc.insert("notes".into(), Value::String(self.notes.clone()));
        doc
    }
}
