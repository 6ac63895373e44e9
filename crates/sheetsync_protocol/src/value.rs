//! Cell and column values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw value from a decoded replication row image.
///
/// Mirrors what a change-log decoder hands over: text may arrive as bytes,
/// booleans as integers.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// SQL NULL.
    Null,
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes (text columns may be delivered this way).
    Bytes(Vec<u8>),
}

impl ColumnValue {
    /// Reads the value as text. Bytes are accepted if they are valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            ColumnValue::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

/// A typed value as it appears in a mirror cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell.
    Null,
    /// Boolean cell.
    Bool(bool),
    /// Integer cell.
    Integer(i64),
    /// Decimal cell.
    Float(f64),
    /// Text cell.
    Text(String),
}

impl CellValue {
    /// Returns true for an empty cell.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns the text content if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to a JSON value as written to the mirror. Empty cells
    /// become empty strings so that overwrites clear them.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::String(String::new()),
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Integer(i) => serde_json::Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_read_as_text() {
        assert_eq!(ColumnValue::Bytes(b"ana".to_vec()).as_text(), Some("ana"));
        assert_eq!(ColumnValue::Bytes(vec![0xff, 0xfe]).as_text(), None);
        assert_eq!(ColumnValue::Integer(4).as_text(), None);
    }

    #[test]
    fn empty_cells() {
        assert!(CellValue::Null.is_empty());
        assert!(CellValue::Text(String::new()).is_empty());
        assert!(!CellValue::Integer(0).is_empty());
    }

    #[test]
    fn null_writes_as_empty_string() {
        assert_eq!(CellValue::Null.to_json(), serde_json::json!(""));
        assert_eq!(CellValue::Float(12.5).to_json(), serde_json::json!(12.5));
    }

    #[test]
    fn deserialize_untagged() {
        let cells: Vec<CellValue> =
            serde_json::from_str(r#"["u-1", 3, 9.5, true, null]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                CellValue::Text("u-1".into()),
                CellValue::Integer(3),
                CellValue::Float(9.5),
                CellValue::Bool(true),
                CellValue::Null,
            ]
        );
    }
}
