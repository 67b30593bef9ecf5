//! Stockroom CLI
//!
//! Command-line front end for a Stockroom inventory.
//!
//! # Commands
//!
//! - `add`, `update`, `delete`, `list`, `search`, `locations` - Record management
//! - `move-out`, `return`, `total` - Transfers between storage and taken-out
//! - `sync` - Compare with the remote copy and optionally resolve

mod commands;

use clap::{Parser, Subcommand};
use commands::records::RecordChanges;
use commands::sync::Resolution;
use commands::OutputFormat;
use std::path::PathBuf;
use stockroom_core::RecordFilter;
use stockroom_sync_engine::RetryConfig;
use tracing_subscriber::EnvFilter;

/// Track items in storage and items taken out.
#[derive(Parser)]
#[command(name = "stockroom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local data directory
    #[arg(global = true, short, long, env = "STOCKROOM_DATA_DIR")]
    path: Option<PathBuf>,

    /// Path to the directory holding the remote copy
    #[arg(global = true, short, long, env = "STOCKROOM_REMOTE_DIR")]
    remote: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a record
    Add {
        /// Item name
        name: String,

        /// Storage location (original location with --taken-out)
        location: String,

        /// Quantity
        #[arg(short, long, default_value = "1")]
        quantity: u32,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Add a taken-out record instead of a storage record
        #[arg(short, long)]
        taken_out: bool,
    },

    /// Update fields of a record
    Update {
        /// Record id
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New location (original location with --taken-out)
        #[arg(long)]
        location: Option<String>,

        /// New quantity
        #[arg(short, long)]
        quantity: Option<u32>,

        /// New notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Update a taken-out record
        #[arg(short, long)]
        taken_out: bool,
    },

    /// Delete a record
    Delete {
        /// Record id
        id: String,

        /// Delete a taken-out record
        #[arg(short, long)]
        taken_out: bool,
    },

    /// List all records
    List {
        /// List taken-out records
        #[arg(short, long)]
        taken_out: bool,
    },

    /// Search records by keyword and location
    Search {
        /// Case-sensitive substring of the name (or notes with --include-notes)
        #[arg(short, long)]
        keyword: Option<String>,

        /// Exact location
        #[arg(short, long)]
        location: Option<String>,

        /// Match the keyword against notes too
        #[arg(short, long)]
        include_notes: bool,

        /// Search taken-out records
        #[arg(short, long)]
        taken_out: bool,
    },

    /// List distinct locations
    Locations {
        /// Use the original locations of taken-out records
        #[arg(short, long)]
        taken_out: bool,
    },

    /// Move one unit of a storage record out
    MoveOut {
        /// Storage record id
        storage_id: String,
    },

    /// Return one unit of a taken-out record to storage
    Return {
        /// Taken-out record id
        taken_out_id: String,
    },

    /// Show the combined quantity of an item at a location
    Total {
        /// Item name
        name: String,

        /// Storage location
        location: String,
    },

    /// Compare with the remote copy
    Sync {
        /// Resolve a divergence in favour of one side
        #[arg(long, value_enum)]
        resolve: Option<Resolution>,

        /// Attempts for an unavailable remote, including the first
        #[arg(long, default_value = "3")]
        attempts: u32,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("Stockroom CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Stockroom Core v{}", stockroom_core::VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Data directory required (--path or STOCKROOM_DATA_DIR)")?;
    if matches!(cli.command, Commands::Sync { .. }) && cli.remote.is_none() {
        return Err("Remote directory required for sync (--remote or STOCKROOM_REMOTE_DIR)".into());
    }
    let service = commands::open_service(&path, cli.remote.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::Add {
            name,
            location,
            quantity,
            notes,
            taken_out,
        } => {
            commands::records::add(&service, format, name, location, quantity, notes, taken_out)
                .await?;
        }
        Commands::Update {
            id,
            name,
            location,
            quantity,
            notes,
            taken_out,
        } => {
            let changes = RecordChanges {
                name,
                location,
                quantity,
                notes,
            };
            commands::records::update(&service, format, id, changes, taken_out).await?;
        }
        Commands::Delete { id, taken_out } => {
            commands::records::delete(&service, format, id, taken_out).await?;
        }
        Commands::List { taken_out } => {
            commands::records::list(&service, format, taken_out).await?;
        }
        Commands::Search {
            keyword,
            location,
            include_notes,
            taken_out,
        } => {
            let mut filter = RecordFilter::new().include_notes(include_notes);
            if let Some(keyword) = keyword {
                filter = filter.keyword(keyword);
            }
            if let Some(location) = location {
                filter = filter.location(location);
            }
            commands::records::search(&service, format, filter, taken_out).await?;
        }
        Commands::Locations { taken_out } => {
            commands::records::locations(&service, format, taken_out).await?;
        }
        Commands::MoveOut { storage_id } => {
            commands::transfer::move_out(&service, format, storage_id).await?;
        }
        Commands::Return { taken_out_id } => {
            commands::transfer::return_item(&service, format, taken_out_id).await?;
        }
        Commands::Total { name, location } => {
            commands::transfer::total(&service, format, name, location).await?;
        }
        Commands::Sync { resolve, attempts } => {
            let retry = RetryConfig::new(attempts.max(1));
            commands::sync::run(&service, format, resolve, &retry).await?;
        }
        Commands::Version => {}
    }

    service.close().await?;
    Ok(())
}
