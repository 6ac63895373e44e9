//! Dump changes command implementation.

use super::open_existing;
use serde::Serialize;
use sheetsync_engine::{classify, Verdict};
use sheetsync_protocol::WATCHED_TABLE;
use sheetsync_store::{ChangeRecord, Store};
use std::path::Path;

/// Change-log record representation for output.
#[derive(Debug, Serialize)]
pub struct ChangeInfo {
    /// Sequence number.
    pub seq: u64,
    /// Row action, if decodable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Row key, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Attribution carried by the row image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// What ingestion would do with the record.
    pub verdict: String,
    /// Decode or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&ChangeRecord> for ChangeInfo {
    fn from(record: &ChangeRecord) -> Self {
        let change = match &record.decoded {
            Ok(change) => change,
            Err(e) => {
                return Self {
                    seq: record.seq,
                    action: None,
                    key: None,
                    actor: None,
                    verdict: "undecodable".to_string(),
                    detail: Some(e.to_string()),
                }
            }
        };

        let image = change.latest_image().ok();
        let text_at = |position: usize| {
            image
                .and_then(|row| row.get(position))
                .and_then(|value| value.as_text())
                .map(str::to_string)
        };

        let verdict = classify(WATCHED_TABLE, change);
        let detail = match &verdict {
            Verdict::Skipped(reason) => Some(reason.clone()),
            _ => None,
        };
        Self {
            seq: record.seq,
            action: Some(change.action.to_string()),
            key: text_at(0),
            actor: text_at(6),
            verdict: verdict.label().to_string(),
            detail,
        }
    }
}

/// Reads up to `limit` records after `offset`.
pub fn collect_changes(
    store: &Store,
    offset: u64,
    limit: Option<usize>,
) -> Result<Vec<ChangeInfo>, Box<dyn std::error::Error>> {
    let records = store.changes_since(offset, limit.unwrap_or(usize::MAX))?;
    Ok(records.iter().map(ChangeInfo::from).collect())
}

/// Runs the dump-changes command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    offset: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let changes = collect_changes(&store, offset, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&changes)?);
        }
        _ => print_text_output(&changes),
    }

    Ok(())
}

fn print_text_output(changes: &[ChangeInfo]) {
    println!("Change Log ({} records)", changes.len());
    println!("================");
    println!();

    for change in changes {
        print!("[{:08}] {:10}", change.seq, change.verdict);

        if let Some(ref action) = change.action {
            print!(" {}", action);
        }
        if let Some(ref key) = change.key {
            print!(" key={}", key);
        }
        if let Some(ref actor) = change.actor {
            print!(" by={}", actor);
        }
        if let Some(ref detail) = change.detail {
            print!(" ({})", detail);
        }

        println!();
    }
}
