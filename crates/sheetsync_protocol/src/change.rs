//! Row changes and the normalized events derived from them.

use crate::attribution::Attribution;
use crate::error::{ProtocolError, ProtocolResult};
use crate::schema::Column;
use crate::value::{CellValue, ColumnValue};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Source tag for events that originate in the authoritative store.
pub const SOURCE_STORE: &str = "STORE";

/// Kind of row mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// Row was inserted.
    Insert,
    /// Row was updated.
    Update,
    /// Row was deleted.
    Delete,
}

impl ChangeAction {
    /// Lowercase name as stored in the change log.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Insert => "insert",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }

    /// Returns true for insert and update.
    pub fn is_upsert(self) -> bool {
        !matches!(self, ChangeAction::Delete)
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(ChangeAction::Insert),
            "update" => Ok(ChangeAction::Update),
            "delete" => Ok(ChangeAction::Delete),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

/// A decoded replication record for one table.
///
/// `rows` holds one or more row images in column order; for updates the
/// last image is the state after the change.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    /// Table the change belongs to.
    pub table: String,
    /// Kind of mutation.
    pub action: ChangeAction,
    /// Row images in column order.
    pub rows: Vec<Vec<ColumnValue>>,
}

impl RowChange {
    /// Creates a record with a single row image.
    pub fn new(table: impl Into<String>, action: ChangeAction, row: Vec<ColumnValue>) -> Self {
        Self {
            table: table.into(),
            action,
            rows: vec![row],
        }
    }

    /// Returns the row image describing the state after the change.
    pub fn latest_image(&self) -> ProtocolResult<&[ColumnValue]> {
        self.rows
            .last()
            .map(Vec::as_slice)
            .ok_or_else(|| ProtocolError::EmptyRowChange {
                table: self.table.clone(),
            })
    }
}

/// A normalized change bound for the mirror.
///
/// Produced once per forwarded replication record and consumed exactly once
/// by the reconciliation worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Where the change came from.
    pub source: &'static str,
    /// Logical row key.
    pub key: String,
    /// Kind of mutation.
    pub action: ChangeAction,
    /// Column values present in the row image.
    pub fields: BTreeMap<Column, CellValue>,
    /// Who made the change.
    pub attribution: Attribution,
}

impl ChangeEvent {
    /// Creates an event from the store.
    pub fn new(
        key: impl Into<String>,
        action: ChangeAction,
        fields: BTreeMap<Column, CellValue>,
        attribution: Attribution,
    ) -> Self {
        Self {
            source: SOURCE_STORE,
            key: key.into(),
            action,
            fields,
            attribution,
        }
    }

    /// Returns the value of a column, if the row image carried it.
    pub fn field(&self, column: Column) -> Option<&CellValue> {
        self.fields.get(&column)
    }

    /// Returns true if the event carries at least one product data column.
    pub fn has_data(&self) -> bool {
        Column::DATA.iter().any(|c| self.fields.contains_key(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_log_names() {
        for action in [ChangeAction::Insert, ChangeAction::Update, ChangeAction::Delete] {
            assert_eq!(action.as_str().parse::<ChangeAction>().unwrap(), action);
        }
        assert!("truncate".parse::<ChangeAction>().is_err());
    }

    #[test]
    fn latest_image_is_last_row() {
        let change = RowChange {
            table: "product".into(),
            action: ChangeAction::Update,
            rows: vec![
                vec![ColumnValue::Text("before".into())],
                vec![ColumnValue::Text("after".into())],
            ],
        };
        assert_eq!(
            change.latest_image().unwrap(),
            &[ColumnValue::Text("after".into())]
        );
    }

    #[test]
    fn empty_change_has_no_image() {
        let change = RowChange {
            table: "product".into(),
            action: ChangeAction::Delete,
            rows: vec![],
        };
        assert!(change.latest_image().is_err());
    }

    #[test]
    fn has_data_ignores_bookkeeping_columns() {
        let mut fields = BTreeMap::new();
        fields.insert(Column::LastUpdatedBy, CellValue::from("ana"));
        let event = ChangeEvent::new("u-1", ChangeAction::Update, fields, Attribution::system());
        assert!(!event.has_data());

        let mut fields = BTreeMap::new();
        fields.insert(Column::Price, CellValue::Float(1.0));
        let event = ChangeEvent::new("u-1", ChangeAction::Update, fields, Attribution::system());
        assert!(event.has_data());
        assert_eq!(event.source, SOURCE_STORE);
    }
}
