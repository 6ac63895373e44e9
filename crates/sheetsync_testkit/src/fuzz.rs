//! Fuzz testing harnesses for sheetsync.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks.

use sheetsync_protocol::{decode_batch, Column, ColumnValue, Field, FieldEdit};
use sheetsync_store::Store;

/// Fuzz target for edit batch decoding.
///
/// Tests that arbitrary bodies either decode into edits that resolve or
/// reject cleanly, or return a decode error. Never panics.
pub fn fuzz_decode_batch(data: &[u8]) {
    if let Ok(edits) = decode_batch(data) {
        for edit in &edits {
            let _ = edit.resolve();
        }
    }
}

/// Fuzz target for row image normalization.
///
/// Interprets the input as raw column values and normalizes each against
/// every column.
pub fn fuzz_normalize(data: &[u8]) {
    for chunk in data.chunks(9) {
        let value = match chunk[0] % 5 {
            0 => ColumnValue::Null,
            1 => ColumnValue::Integer(i64::from_le_bytes(padded(&chunk[1..]))),
            2 => ColumnValue::Real(f64::from_le_bytes(padded(&chunk[1..]))),
            3 => ColumnValue::Text(String::from_utf8_lossy(&chunk[1..]).into_owned()),
            _ => ColumnValue::Bytes(chunk[1..].to_vec()),
        };
        for column in Column::ALL {
            let _ = column.normalize(&value);
        }
    }
}

fn padded(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    let len = bytes.len().min(8);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

/// Fuzz target for applying mirror edits to a store.
///
/// Each 4-byte group selects a key, a field, a value and an actor. Every
/// resolved edit is applied in its own transaction. Afterwards no more rows
/// exist than distinct keys were used.
pub fn fuzz_edit_application(data: &[u8]) {
    const KEYS: [&str; 4] = ["u-a", "u-b", "u-c", ""];
    const ACTORS: [&str; 3] = ["", "ana@example.com", sheetsync_protocol::SENTINEL];

    let store = match Store::open_in_memory() {
        Ok(store) => store,
        Err(_) => return,
    };

    for group in data.chunks_exact(4) {
        let key = KEYS[usize::from(group[0]) % KEYS.len()];
        let field = Field::ALL[usize::from(group[1]) % Field::ALL.len()];
        let value = match field {
            Field::ProductName => serde_json::json!(format!("P{}", group[2])),
            Field::Quantity => serde_json::json!(group[2]),
            Field::Price => serde_json::json!(f64::from(group[2]) / 4.0),
            Field::Discount => serde_json::json!(group[2] % 2 == 0),
        };
        let actor = ACTORS[usize::from(group[3]) % ACTORS.len()];

        let edit = FieldEdit::new(key, field.label(), value, actor);
        if let Ok(resolved) = edit.resolve() {
            let _ = store.transaction(|tx| tx.upsert_field(&resolved));
        }
    }

    let rows = store.list_products().map(|p| p.len()).unwrap_or(0);
    assert!(rows <= KEYS.len() - 1, "more rows than distinct keys");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_decode_batch_no_panic() {
        fuzz_decode_batch(&[]);
        fuzz_decode_batch(b"{");
        fuzz_decode_batch(b"[{\"uuid\":1}]");
        fuzz_decode_batch(br#"{"uuid":"a","field":"Price","value":"x"}"#);
        fuzz_decode_batch(&[0xFF; 64]);
    }

    #[test]
    fn test_fuzz_normalize_no_panic() {
        fuzz_normalize(&[]);
        fuzz_normalize(&[1, 2, 3]);
        fuzz_normalize(&(0u8..=255).collect::<Vec<_>>());
    }

    #[test]
    fn test_fuzz_edit_application() {
        fuzz_edit_application(&[]);
        fuzz_edit_application(&[0, 0, 7, 1, 1, 2, 3, 0, 2, 3, 4, 2]);
        fuzz_edit_application(&(0u8..=255).collect::<Vec<_>>());
    }
}
