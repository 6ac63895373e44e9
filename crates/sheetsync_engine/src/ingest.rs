//! Change ingestion: row changes in, normalized events out.
//!
//! The filter runs on the replication stream's thread. It decides whether a
//! record is forwarded, builds the [`ChangeEvent`], and pushes it onto the
//! bounded event queue with a blocking send. A full queue stalls the stream
//! rather than dropping a change.

use crate::error::{EngineError, EngineResult};
use sheetsync_protocol::{Attribution, CellValue, ChangeEvent, Column, ColumnValue, RowChange};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Sending half of the event queue.
pub type EventSender = mpsc::Sender<ChangeEvent>;

/// Receiving half of the event queue.
pub type EventReceiver = mpsc::Receiver<ChangeEvent>;

/// Creates the bounded event queue.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity.max(1))
}

/// What ingestion decided for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The record becomes an event for the worker.
    Forwarded(ChangeEvent),
    /// The record was written by the engine itself.
    Suppressed,
    /// The record cannot be turned into an event.
    Skipped(String),
}

impl Verdict {
    /// Short label for logs and the CLI.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Forwarded(_) => "forwarded",
            Verdict::Suppressed => "suppressed",
            Verdict::Skipped(_) => "skipped",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Skipped(reason) => write!(f, "skipped ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Classifies a record for `table` without sending anything.
pub fn classify(table: &str, change: &RowChange) -> Verdict {
    if change.table != table {
        return Verdict::Skipped(format!("table {} is not watched", change.table));
    }
    let image = match change.latest_image() {
        Ok(image) => image,
        Err(e) => return Verdict::Skipped(e.to_string()),
    };

    let actor = image
        .get(Column::LastUpdatedBy.position())
        .and_then(ColumnValue::as_text);
    let attribution = Attribution::from_actor(actor);
    if attribution.is_sentinel() {
        return Verdict::Suppressed;
    }

    let key = match image.get(Column::Uuid.position()).and_then(ColumnValue::as_text) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => return Verdict::Skipped("row image has no key".to_string()),
    };

    Verdict::Forwarded(ChangeEvent::new(
        key,
        change.action,
        field_map(image),
        attribution,
    ))
}

/// Builds the field map from whatever columns the image carries.
fn field_map(image: &[ColumnValue]) -> BTreeMap<Column, CellValue> {
    Column::ALL
        .iter()
        .filter(|column| **column != Column::Uuid)
        .filter_map(|column| {
            let raw = image.get(column.position())?;
            column.normalize(raw).map(|value| (*column, value))
        })
        .collect()
}

/// The ingestion filter for one watched table.
#[derive(Debug, Clone)]
pub struct IngestionFilter {
    table: String,
    events: EventSender,
}

impl IngestionFilter {
    /// Creates a filter publishing onto `events`.
    pub fn new(table: impl Into<String>, events: EventSender) -> Self {
        Self {
            table: table.into(),
            events,
        }
    }

    /// Returns the watched table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Processes one record, blocking while the queue is full.
    ///
    /// Must not be called from inside an async runtime.
    pub fn ingest(&self, change: &RowChange) -> EngineResult<Verdict> {
        let verdict = classify(&self.table, change);
        match &verdict {
            Verdict::Forwarded(event) => {
                debug!(key = %event.key, action = %event.action, actor = %event.attribution, "Change forwarded");
                self.events
                    .blocking_send(event.clone())
                    .map_err(|_| EngineError::QueueClosed)?;
            }
            Verdict::Suppressed => {
                debug!(table = %change.table, action = %change.action, "Suppressed self-inflicted change");
            }
            Verdict::Skipped(reason) => {
                warn!(table = %change.table, action = %change.action, reason = %reason, "Skipped change record");
            }
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsync_protocol::{ChangeAction, SENTINEL};

    fn image(key: &str, actor: Option<&str>) -> Vec<ColumnValue> {
        let mut row = vec![
            ColumnValue::Text(key.into()),
            ColumnValue::Text("Mouse".into()),
            ColumnValue::Integer(3),
            ColumnValue::Real(9.5),
            ColumnValue::Integer(0),
            ColumnValue::Text("2024-01-01 00:00:00".into()),
        ];
        if let Some(actor) = actor {
            row.push(ColumnValue::Bytes(actor.as_bytes().to_vec()));
        }
        row
    }

    #[test]
    fn forwards_real_actor() {
        let change = RowChange::new("product", ChangeAction::Update, image("u-1", Some("ana")));
        let Verdict::Forwarded(event) = classify("product", &change) else {
            panic!("expected forwarded");
        };
        assert_eq!(event.key, "u-1");
        assert_eq!(event.action, ChangeAction::Update);
        assert_eq!(event.attribution.as_str(), "ana");
        assert_eq!(event.field(Column::Quantity), Some(&CellValue::Integer(3)));
        assert_eq!(event.field(Column::Discount), Some(&CellValue::Bool(false)));
        assert!(event.field(Column::Uuid).is_none());
    }

    #[test]
    fn suppresses_sentinel() {
        for action in [ChangeAction::Insert, ChangeAction::Update, ChangeAction::Delete] {
            let change = RowChange::new("product", action, image("u-1", Some(SENTINEL)));
            assert_eq!(classify("product", &change), Verdict::Suppressed);
        }
    }

    #[test]
    fn missing_actor_defaults_to_system() {
        let change = RowChange::new("product", ChangeAction::Insert, image("u-1", None));
        let Verdict::Forwarded(event) = classify("product", &change) else {
            panic!("expected forwarded");
        };
        assert_eq!(event.attribution, Attribution::system());
        assert!(event.field(Column::LastUpdatedBy).is_none());
    }

    #[test]
    fn short_rows_degrade() {
        let change = RowChange::new(
            "product",
            ChangeAction::Delete,
            vec![ColumnValue::Text("u-1".into())],
        );
        let Verdict::Forwarded(event) = classify("product", &change) else {
            panic!("expected forwarded");
        };
        assert!(event.fields.is_empty());
        assert!(!event.has_data());
    }

    #[test]
    fn skips_unwatched_and_empty() {
        let other = RowChange::new("orders", ChangeAction::Insert, image("u-1", None));
        assert!(matches!(classify("product", &other), Verdict::Skipped(_)));

        let empty = RowChange {
            table: "product".into(),
            action: ChangeAction::Update,
            rows: vec![],
        };
        assert!(matches!(classify("product", &empty), Verdict::Skipped(_)));

        let keyless = RowChange::new("product", ChangeAction::Insert, vec![]);
        assert!(matches!(classify("product", &keyless), Verdict::Skipped(_)));
    }

    #[test]
    fn ingest_enqueues_forwarded_only() {
        let (tx, mut rx) = event_channel(4);
        let filter = IngestionFilter::new("product", tx);

        filter
            .ingest(&RowChange::new("product", ChangeAction::Insert, image("u-1", Some("ana"))))
            .unwrap();
        filter
            .ingest(&RowChange::new("product", ChangeAction::Update, image("u-1", Some(SENTINEL))))
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().key, "u-1");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ingest_after_consumer_gone_fails() {
        let (tx, rx) = event_channel(1);
        drop(rx);
        let filter = IngestionFilter::new("product", tx);
        let result = filter.ingest(&RowChange::new(
            "product",
            ChangeAction::Insert,
            image("u-1", None),
        ));
        assert!(matches!(result, Err(EngineError::QueueClosed)));
    }

    #[test]
    fn verdict_display() {
        assert_eq!(Verdict::Suppressed.to_string(), "suppressed");
        assert_eq!(Verdict::Skipped("x".into()).to_string(), "skipped (x)");
    }
}
