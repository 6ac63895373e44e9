//! Reading the trigger-maintained change log.

use crate::error::StoreResult;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use sheetsync_protocol::{
    ChangeAction, ColumnValue, ProtocolResult, RowChange, SyncPosition, WATCHED_TABLE,
};

/// Name reported as the file component of a sync position.
pub const CHANGE_LOG_FILE: &str = "change_log";

/// One entry of the change log.
#[derive(Debug)]
pub struct ChangeRecord {
    /// Log sequence number. Strictly increasing in commit order.
    pub seq: u64,
    /// Decoded change, or the reason it could not be decoded.
    pub decoded: ProtocolResult<RowChange>,
}

impl ChangeRecord {
    /// Position just past this record.
    pub fn position(&self) -> SyncPosition {
        SyncPosition::new(CHANGE_LOG_FILE, self.seq)
    }
}

pub(crate) fn current_position(conn: &Connection) -> StoreResult<SyncPosition> {
    let head: i64 = conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM change_log", [], |row| {
        row.get(0)
    })?;
    Ok(SyncPosition::new(CHANGE_LOG_FILE, head.max(0) as u64))
}

pub(crate) fn changes_since(
    conn: &Connection,
    offset: u64,
    limit: usize,
) -> StoreResult<Vec<ChangeRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT seq, action, uuid, product_name, quantity, price, discount, updated_at, last_updated_by
         FROM change_log WHERE seq > ?1 ORDER BY seq LIMIT ?2",
    )?;
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let records = stmt
        .query_map(params![offset, limit], decode_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn decode_record(row: &Row<'_>) -> rusqlite::Result<ChangeRecord> {
    let seq: i64 = row.get(0)?;
    let action: String = row.get(1)?;
    let image = (2..9)
        .map(|idx| row.get_ref(idx).map(column_value))
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let decoded = action
        .parse::<ChangeAction>()
        .map(|action| RowChange::new(WATCHED_TABLE, action, image));

    Ok(ChangeRecord {
        seq: seq.max(0) as u64,
        decoded,
    })
}

pub(crate) fn column_value(value: ValueRef<'_>) -> ColumnValue {
    match value {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(i) => ColumnValue::Integer(i),
        ValueRef::Real(f) => ColumnValue::Real(f),
        ValueRef::Text(t) => ColumnValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => ColumnValue::Bytes(b.to_vec()),
    }
}
