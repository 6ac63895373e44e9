//! sheetsync CLI
//!
//! Command-line tools for inspecting and driving a sheetsync store.
//!
//! # Commands
//!
//! - `position` - Print the current change-log position
//! - `snapshot` - Print store rows as a full resync would write them
//! - `dump-changes` - Dump change-log records with their ingestion verdict
//! - `apply-edits` - Run reverse batch apply on a JSON file
//! - `auth-status` - Show the stored mirror credential
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// sheetsync command-line tools.
#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite store
    #[arg(global = true, short, long, env = "SHEETSYNC_DB")]
    db: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current change-log position
    Position {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print store rows as a full resync would write them
    Snapshot {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump change-log records with their ingestion verdict
    DumpChanges {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Start after this sequence number
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply a JSON batch of mirror edits to the store
    ApplyEdits {
        /// File holding one edit object or an array of them
        file: PathBuf,
    },

    /// Show the stored mirror credential
    AuthStatus {
        /// Spreadsheet the engine syncs with
        #[arg(short, long, env = "SPREADSHEET_ID")]
        spreadsheet_id: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Position { format } => {
            let db = cli.db.ok_or("Store path required for position")?;
            commands::position::run(&db, &format)?;
        }
        Commands::Snapshot { format } => {
            let db = cli.db.ok_or("Store path required for snapshot")?;
            commands::snapshot::run(&db, &format)?;
        }
        Commands::DumpChanges {
            limit,
            offset,
            format,
        } => {
            let db = cli.db.ok_or("Store path required for dump-changes")?;
            commands::dump_changes::run(&db, limit, offset, &format)?;
        }
        Commands::ApplyEdits { file } => {
            let db = cli.db.ok_or("Store path required for apply-edits")?;
            commands::apply_edits::run(&db, &file)?;
        }
        Commands::AuthStatus { spreadsheet_id } => {
            let db = cli.db.ok_or("Store path required for auth-status")?;
            commands::auth_status::run(&db, spreadsheet_id.as_deref())?;
        }
        Commands::Version => {
            println!("sheetsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("store schema v{}", sheetsync_store::CURRENT_VERSION);
        }
    }

    Ok(())
}
