//! Transfer commands: move-out, return, total.

use super::{emit, CliResult, OutputFormat, Row, Service};
use serde::Serialize;
use stockroom_core::RecordId;

/// Runs the move-out command.
pub async fn move_out(
    service: &Service,
    format: OutputFormat,
    storage_id: String,
) -> CliResult<()> {
    let taken = service.move_out(RecordId::new(storage_id)).await?;
    emit(format, &taken, |t| println!("Moved out {}", t.row()))
}

/// Runs the return command.
pub async fn return_item(
    service: &Service,
    format: OutputFormat,
    taken_out_id: String,
) -> CliResult<()> {
    let outcome = service.return_item(RecordId::new(taken_out_id)).await?;
    emit(format, &outcome, |o| {
        if o.created_storage {
            println!("Returned to new record {}", o.storage.row());
        } else {
            println!("Returned to {}", o.storage.row());
        }
        if o.remaining_out > 0 {
            println!("{} still taken out", o.remaining_out);
        }
    })
}

/// Runs the total command.
pub async fn total(
    service: &Service,
    format: OutputFormat,
    name: String,
    location: String,
) -> CliResult<()> {
    let quantity = service.total_quantity(name.clone(), location.clone()).await?;

    #[derive(Serialize)]
    struct Total {
        name: String,
        location: String,
        quantity: u64,
    }

    emit(
        format,
        &Total {
            name,
            location,
            quantity,
        },
        |t| println!("{} at {}: {} in total", t.name, t.location, t.quantity),
    )
}
