//! Mirror client abstraction and the row layout written through it.
//!
//! The mirror is a grid of cells. Row 0 is the header; data rows start at
//! grid index 1. Columns A..G hold, in order: key, product name, quantity,
//! price, discount, timestamp and updated-by.

use crate::error::EngineResult;
use sheetsync_protocol::{Attribution, CellValue, ChangeEvent, Column, ProductRow};
use tracing::{info, warn};

/// Header labels for columns A..G.
pub const HEADER: [&str; 7] = [
    "UUID",
    "Product Name",
    "Quantity",
    "Price",
    "Discount",
    "Last Updated",
    "Updated By",
];

/// Number of columns written per row.
pub const ROW_WIDTH: usize = HEADER.len();

/// Format of the timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A client for the external tabular mirror.
///
/// All calls are synchronous and may fail. Row indices are zero-based grid
/// indices, header included.
pub trait MirrorClient: Send + Sync {
    /// Reads column A in full, one entry per grid row.
    fn read_key_column(&self) -> EngineResult<Vec<CellValue>>;

    /// Reads one grid row.
    fn read_row(&self, row: usize) -> EngineResult<Vec<CellValue>>;

    /// Overwrites columns B..G of a grid row.
    fn update_row(&self, row: usize, values: &[CellValue]) -> EngineResult<()>;

    /// Appends a row covering columns A..G.
    fn append_row(&self, values: &[CellValue]) -> EngineResult<()>;

    /// Removes a grid row, shifting later rows up.
    fn delete_row(&self, row: usize) -> EngineResult<()>;

    /// Clears every data cell, keeping the header row.
    fn clear_data(&self) -> EngineResult<()>;

    /// Writes rows starting at the first data row.
    fn write_rows(&self, rows: &[Vec<CellValue>]) -> EngineResult<()>;

    /// Writes the header row.
    fn write_header(&self, labels: &[&str]) -> EngineResult<()>;
}

/// Writes the header if the mirror's first cell is empty.
///
/// Returns true if the header was written.
pub fn ensure_header(client: &dyn MirrorClient) -> EngineResult<bool> {
    let first = client.read_row(0)?;
    if first.first().is_some_and(|cell| !cell.is_empty()) {
        return Ok(false);
    }
    info!("Mirror is empty, writing header");
    client.write_header(&HEADER)?;
    Ok(true)
}

/// Same as [`ensure_header`] but only logs failures.
pub(crate) fn ensure_header_or_warn(client: &dyn MirrorClient) {
    if let Err(e) = ensure_header(client) {
        warn!(error = %e, "Failed to initialize mirror header");
    }
}

/// Builds the A..G row for an event.
///
/// Columns absent from the event are written as empty cells.
pub fn event_row(event: &ChangeEvent, timestamp: &str) -> Vec<CellValue> {
    let data = |column: Column| event.field(column).cloned().unwrap_or(CellValue::Null);
    vec![
        CellValue::from(event.key.as_str()),
        data(Column::ProductName),
        data(Column::Quantity),
        data(Column::Price),
        data(Column::Discount),
        CellValue::from(timestamp),
        CellValue::from(event.attribution.as_str()),
    ]
}

/// Builds the A..G row for a store row during full resync.
///
/// Rows with no known last writer are attributed to the resync fallback.
pub fn resync_row(row: &ProductRow, timestamp: &str) -> Vec<CellValue> {
    let updated_by = Attribution::for_resync(row.last_updated_by.as_deref());
    vec![
        CellValue::from(row.uuid.as_str()),
        CellValue::from(row.product_name.as_str()),
        CellValue::Integer(row.quantity),
        CellValue::Float(row.price),
        CellValue::Bool(row.discount),
        CellValue::from(timestamp),
        CellValue::from(updated_by.as_str()),
    ]
}

/// Returns the B..G part of an A..G row.
pub fn update_slice(row: &[CellValue]) -> &[CellValue] {
    row.get(1..).unwrap_or(&[])
}

/// Current time in mirror timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}
