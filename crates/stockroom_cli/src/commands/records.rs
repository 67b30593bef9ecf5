//! Record commands: add, update, delete, list, search, locations.

use super::{emit, print_rows, CliResult, OutputFormat, Row, Service};
use serde::Serialize;
use stockroom_core::{
    RecordFilter, RecordId, StorageDraft, StorageRecord, TakenOutDraft, TakenOutRecord,
};
use tracing::info;

/// Fields of an update; `None` leaves the field unchanged.
#[derive(Debug, Default, Clone)]
pub struct RecordChanges {
    /// New name.
    pub name: Option<String>,
    /// New location (the original location for taken-out records).
    pub location: Option<String>,
    /// New quantity.
    pub quantity: Option<u32>,
    /// New notes.
    pub notes: Option<String>,
}

impl RecordChanges {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.quantity.is_none()
            && self.notes.is_none()
    }

    fn apply_storage(self, record: &mut StorageRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(location) = self.location {
            record.location = location;
        }
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(notes) = self.notes {
            record.notes = notes;
        }
    }

    fn apply_taken_out(self, record: &mut TakenOutRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(location) = self.location {
            record.original_location = location;
        }
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(notes) = self.notes {
            record.notes = notes;
        }
    }
}

/// Runs the add command.
pub async fn add(
    service: &Service,
    format: OutputFormat,
    name: String,
    location: String,
    quantity: u32,
    notes: Option<String>,
    taken_out: bool,
) -> CliResult<()> {
    let notes = notes.unwrap_or_default();
    if taken_out {
        let draft = TakenOutDraft::new(name, location, quantity).with_notes(notes);
        let record: TakenOutRecord = service.add(draft).await?;
        info!(id = %record.id, "added taken-out record");
        emit(format, &record, |r| println!("Added {}", r.row()))
    } else {
        let draft = StorageDraft::new(name, location, quantity).with_notes(notes);
        let record: StorageRecord = service.add(draft).await?;
        info!(id = %record.id, "added storage record");
        emit(format, &record, |r| println!("Added {}", r.row()))
    }
}

/// Runs the update command.
pub async fn update(
    service: &Service,
    format: OutputFormat,
    id: String,
    changes: RecordChanges,
    taken_out: bool,
) -> CliResult<()> {
    if changes.is_empty() {
        return Err("Nothing to update: pass at least one field".into());
    }
    let id = RecordId::new(id);

    if taken_out {
        let mut record: TakenOutRecord = service
            .get(id.clone())
            .await?
            .ok_or_else(|| format!("No taken-out record with id {}", id))?;
        changes.apply_taken_out(&mut record);
        service.update(record.clone()).await?;
        emit(format, &record, |r| println!("Updated {}", r.row()))
    } else {
        let mut record: StorageRecord = service
            .get(id.clone())
            .await?
            .ok_or_else(|| format!("No storage record with id {}", id))?;
        changes.apply_storage(&mut record);
        service.update(record.clone()).await?;
        emit(format, &record, |r| println!("Updated {}", r.row()))
    }
}

/// Runs the delete command.
pub async fn delete(
    service: &Service,
    format: OutputFormat,
    id: String,
    taken_out: bool,
) -> CliResult<()> {
    let id = RecordId::new(id);
    let deleted = if taken_out {
        service.delete::<TakenOutRecord>(id.clone()).await?.is_some()
    } else {
        service.delete::<StorageRecord>(id.clone()).await?.is_some()
    };

    #[derive(Serialize)]
    struct Deleted {
        id: RecordId,
        deleted: bool,
    }

    emit(format, &Deleted { id, deleted }, |d| {
        if d.deleted {
            println!("Deleted {}", d.id);
        } else {
            println!("No record with id {}", d.id);
        }
    })
}

/// Runs the list command.
pub async fn list(service: &Service, format: OutputFormat, taken_out: bool) -> CliResult<()> {
    if taken_out {
        let records = service.list::<TakenOutRecord>().await?;
        emit(format, &records, |r| print_rows(r))
    } else {
        let records = service.list::<StorageRecord>().await?;
        emit(format, &records, |r| print_rows(r))
    }
}

/// Runs the search command.
pub async fn search(
    service: &Service,
    format: OutputFormat,
    filter: RecordFilter,
    taken_out: bool,
) -> CliResult<()> {
    if taken_out {
        let records = service.search::<TakenOutRecord>(filter).await?;
        emit(format, &records, |r| print_rows(r))
    } else {
        let records = service.search::<StorageRecord>(filter).await?;
        emit(format, &records, |r| print_rows(r))
    }
}

/// Runs the locations command.
pub async fn locations(service: &Service, format: OutputFormat, taken_out: bool) -> CliResult<()> {
    let locations = if taken_out {
        service.locations::<TakenOutRecord>().await?
    } else {
        service.locations::<StorageRecord>().await?
    };
    emit(format, &locations, |locations| {
        for location in locations {
            if location.is_empty() {
                println!("(none)");
            } else {
                println!("{}", location);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_apply_only_given_fields() {
        let mut record = StorageRecord {
            id: RecordId::new("1"),
            name: "Drill".into(),
            location: "ShelfA".into(),
            quantity: 3,
            notes: "cordless".into(),
        };
        RecordChanges {
            quantity: Some(5),
            ..RecordChanges::default()
        }
        .apply_storage(&mut record);

        assert_eq!(record.quantity, 5);
        assert_eq!(record.name, "Drill");
        assert_eq!(record.notes, "cordless");
    }

    #[test]
    fn location_change_moves_taken_out_origin() {
        let mut record = TakenOutRecord {
            id: RecordId::new("1"),
            name: "Drill".into(),
            original_location: "ShelfA".into(),
            quantity: 1,
            notes: String::new(),
        };
        RecordChanges {
            location: Some("ShelfB".into()),
            ..RecordChanges::default()
        }
        .apply_taken_out(&mut record);
        assert_eq!(record.original_location, "ShelfB");
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(RecordChanges::default().is_empty());
        assert!(!RecordChanges {
            notes: Some(String::new()),
            ..RecordChanges::default()
        }
        .is_empty());
    }
}
