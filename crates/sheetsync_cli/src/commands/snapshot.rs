//! Snapshot command implementation.

use super::open_existing;
use sheetsync_engine::{now_timestamp, resync_row, HEADER};
use sheetsync_protocol::CellValue;
use sheetsync_store::Store;
use std::path::Path;

/// Builds the rows a full resync would write, header first.
pub fn collect_rows(store: &Store) -> Result<Vec<Vec<CellValue>>, Box<dyn std::error::Error>> {
    let timestamp = now_timestamp();
    let mut rows = vec![HEADER.iter().map(|label| CellValue::from(*label)).collect()];
    rows.extend(
        store
            .list_products()?
            .iter()
            .map(|product| resync_row(product, &timestamp)),
    );
    Ok(rows)
}

/// Runs the snapshot command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let rows = collect_rows(&store)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => print_text_output(&rows),
    }

    Ok(())
}

fn print_text_output(rows: &[Vec<CellValue>]) {
    let widths: Vec<usize> = (0..HEADER.len())
        .map(|col| {
            rows.iter()
                .map(|row| row.get(col).map(|c| c.to_string().len()).unwrap_or(0))
                .max()
                .unwrap_or(0)
        })
        .collect();

    for (index, row) in rows.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell.to_string(), width = width))
            .collect();
        println!("{}", line.join(" | "));
        if index == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            println!("{}", rule.join("-+-"));
        }
    }
    println!();
    println!("{} rows", rows.len().saturating_sub(1));
}
