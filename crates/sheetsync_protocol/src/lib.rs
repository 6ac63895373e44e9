//! # sheetsync protocol
//!
//! Shared types for keeping a relational table and a spreadsheet mirror
//! convergent in both directions.
//!
//! This crate provides:
//! - `RowChange` / `ColumnValue` for decoded replication records
//! - `ChangeEvent` for normalized changes bound for the mirror
//! - `Attribution` for actor tagging and loop prevention
//! - `Column` / `Field` for the fixed row schema and the edit whitelist
//! - `FieldEdit` and shape-tolerant batch decoding for mirror edits
//! - `SyncPosition` for change-log resume points
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attribution;
mod change;
mod edit;
mod error;
mod position;
mod schema;
mod value;

pub use attribution::{Attribution, RESYNC_FALLBACK, SENTINEL, SYSTEM};
pub use change::{ChangeAction, ChangeEvent, RowChange, SOURCE_STORE};
pub use edit::{decode_batch, EditRejection, FieldEdit, ResolvedEdit};
pub use error::{ProtocolError, ProtocolResult};
pub use position::SyncPosition;
pub use schema::{Column, Field, ProductRow, WATCHED_TABLE};
pub use value::{CellValue, ColumnValue};
