//! Fixed row schema of the watched table.

use crate::value::{CellValue, ColumnValue};
use serde::{Deserialize, Serialize};

/// Name of the watched table.
pub const WATCHED_TABLE: &str = "product";

/// Physical columns of the watched table, in row-image order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    /// Logical row key.
    Uuid,
    /// Product name.
    ProductName,
    /// Stock quantity.
    Quantity,
    /// Unit price.
    Price,
    /// Discount flag.
    Discount,
    /// Last modification time.
    UpdatedAt,
    /// Last writer identity.
    LastUpdatedBy,
}

impl Column {
    /// All columns in row-image order.
    pub const ALL: [Column; 7] = [
        Column::Uuid,
        Column::ProductName,
        Column::Quantity,
        Column::Price,
        Column::Discount,
        Column::UpdatedAt,
        Column::LastUpdatedBy,
    ];

    /// The product data columns carried to the mirror.
    pub const DATA: [Column; 4] = [
        Column::ProductName,
        Column::Quantity,
        Column::Price,
        Column::Discount,
    ];

    /// Position of the column in a row image.
    pub fn position(self) -> usize {
        match self {
            Column::Uuid => 0,
            Column::ProductName => 1,
            Column::Quantity => 2,
            Column::Price => 3,
            Column::Discount => 4,
            Column::UpdatedAt => 5,
            Column::LastUpdatedBy => 6,
        }
    }

    /// SQL column name.
    pub fn name(self) -> &'static str {
        match self {
            Column::Uuid => "uuid",
            Column::ProductName => "product_name",
            Column::Quantity => "quantity",
            Column::Price => "price",
            Column::Discount => "discount",
            Column::UpdatedAt => "updated_at",
            Column::LastUpdatedBy => "last_updated_by",
        }
    }

    /// Converts a raw row-image value into the column's canonical cell type.
    ///
    /// Returns `None` when the value cannot represent this column.
    pub fn normalize(self, value: &ColumnValue) -> Option<CellValue> {
        if value.is_null() {
            return Some(CellValue::Null);
        }
        match self {
            Column::Uuid | Column::ProductName | Column::UpdatedAt | Column::LastUpdatedBy => {
                match value {
                    ColumnValue::Integer(i) => Some(CellValue::Text(i.to_string())),
                    ColumnValue::Real(f) => Some(CellValue::Text(f.to_string())),
                    other => other.as_text().map(CellValue::from),
                }
            }
            Column::Quantity => match value {
                ColumnValue::Integer(i) => Some(CellValue::Integer(*i)),
                ColumnValue::Real(f) => Some(CellValue::Integer(f.trunc() as i64)),
                other => other
                    .as_text()
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .map(CellValue::Integer),
            },
            Column::Price => match value {
                ColumnValue::Real(f) => Some(CellValue::Float(*f)),
                ColumnValue::Integer(i) => Some(CellValue::Float(*i as f64)),
                other => other
                    .as_text()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .map(CellValue::Float),
            },
            Column::Discount => match value {
                ColumnValue::Integer(i) => Some(CellValue::Bool(*i != 0)),
                ColumnValue::Real(f) => Some(CellValue::Bool(*f != 0.0)),
                other => other.as_text().and_then(|s| match s.trim() {
                    "1" | "true" | "TRUE" => Some(CellValue::Bool(true)),
                    "0" | "false" | "FALSE" => Some(CellValue::Bool(false)),
                    _ => None,
                }),
            },
        }
    }
}

/// Logical fields a mirror edit may target.
///
/// This is the whole whitelist: a label that does not resolve to a variant
/// is rejected before any SQL is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// "Product Name"
    ProductName,
    /// "Quantity"
    Quantity,
    /// "Price"
    Price,
    /// "Discount"
    Discount,
}

impl Field {
    /// All editable fields.
    pub const ALL: [Field; 4] = [
        Field::ProductName,
        Field::Quantity,
        Field::Price,
        Field::Discount,
    ];

    /// Resolves a mirror header label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Product Name" => Some(Field::ProductName),
            "Quantity" => Some(Field::Quantity),
            "Price" => Some(Field::Price),
            "Discount" => Some(Field::Discount),
            _ => None,
        }
    }

    /// Mirror header label.
    pub fn label(self) -> &'static str {
        match self {
            Field::ProductName => "Product Name",
            Field::Quantity => "Quantity",
            Field::Price => "Price",
            Field::Discount => "Discount",
        }
    }

    /// Physical column backing the field.
    pub fn column(self) -> Column {
        match self {
            Field::ProductName => Column::ProductName,
            Field::Quantity => Column::Quantity,
            Field::Price => Column::Price,
            Field::Discount => Column::Discount,
        }
    }

    /// Coerces a raw JSON value from the mirror into the field's type.
    pub fn coerce(self, raw: &serde_json::Value) -> Result<CellValue, String> {
        use serde_json::Value;

        match self {
            Field::ProductName => Ok(CellValue::Text(match raw {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })),
            Field::Quantity => match raw {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                    .map(CellValue::Integer)
                    .ok_or_else(|| format!("quantity out of range: {n}")),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(CellValue::Integer)
                    .map_err(|e| format!("quantity {s:?}: {e}")),
                other => Err(format!("quantity must be a number, got {other}")),
            },
            Field::Price => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .map(CellValue::Float)
                    .ok_or_else(|| format!("price out of range: {n}")),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(CellValue::Float)
                    .map_err(|e| format!("price {s:?}: {e}")),
                other => Err(format!("price must be a number, got {other}")),
            },
            Field::Discount => Ok(CellValue::Bool(match raw {
                Value::Bool(b) => *b,
                Value::String(s) => s == "true" || s == "TRUE",
                _ => false,
            })),
        }
    }
}

/// A full row of the watched table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    /// Logical key.
    pub uuid: String,
    /// Product name.
    pub product_name: String,
    /// Stock quantity.
    pub quantity: i64,
    /// Unit price.
    pub price: f64,
    /// Discount flag.
    pub discount: bool,
    /// Last modification time, if recorded.
    pub updated_at: Option<String>,
    /// Last writer identity, if recorded.
    pub last_updated_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_positions_follow_row_order() {
        for (i, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.position(), i);
        }
    }

    #[test]
    fn normalize_discount_from_integer() {
        assert_eq!(
            Column::Discount.normalize(&ColumnValue::Integer(1)),
            Some(CellValue::Bool(true))
        );
        assert_eq!(
            Column::Discount.normalize(&ColumnValue::Integer(0)),
            Some(CellValue::Bool(false))
        );
        assert_eq!(Column::Discount.normalize(&ColumnValue::Text("maybe".into())), None);
    }

    #[test]
    fn normalize_text_from_bytes() {
        assert_eq!(
            Column::ProductName.normalize(&ColumnValue::Bytes(b"Mouse".to_vec())),
            Some(CellValue::Text("Mouse".into()))
        );
        assert_eq!(
            Column::Price.normalize(&ColumnValue::Integer(3)),
            Some(CellValue::Float(3.0))
        );
        assert_eq!(
            Column::Quantity.normalize(&ColumnValue::Null),
            Some(CellValue::Null)
        );
    }

    #[test]
    fn whitelist_labels() {
        for field in Field::ALL {
            assert_eq!(Field::from_label(field.label()), Some(field));
        }
        assert_eq!(Field::from_label("uuid"), None);
        assert_eq!(Field::from_label("last_updated_by"), None);
        assert_eq!(Field::from_label("product_name"), None);
    }

    #[test]
    fn coerce_quantity() {
        assert_eq!(Field::Quantity.coerce(&json!(3)), Ok(CellValue::Integer(3)));
        assert_eq!(Field::Quantity.coerce(&json!(3.9)), Ok(CellValue::Integer(3)));
        assert_eq!(Field::Quantity.coerce(&json!("12")), Ok(CellValue::Integer(12)));
        assert!(Field::Quantity.coerce(&json!("lots")).is_err());
        assert!(Field::Quantity.coerce(&json!(true)).is_err());
    }

    #[test]
    fn coerce_price_and_name() {
        assert_eq!(Field::Price.coerce(&json!(12.5)), Ok(CellValue::Float(12.5)));
        assert_eq!(Field::Price.coerce(&json!("9.99")), Ok(CellValue::Float(9.99)));
        assert_eq!(
            Field::ProductName.coerce(&json!("Keyboard")),
            Ok(CellValue::Text("Keyboard".into()))
        );
        assert_eq!(
            Field::ProductName.coerce(&json!(42)),
            Ok(CellValue::Text("42".into()))
        );
    }

    #[test]
    fn coerce_discount() {
        assert_eq!(Field::Discount.coerce(&json!(true)), Ok(CellValue::Bool(true)));
        assert_eq!(Field::Discount.coerce(&json!("TRUE")), Ok(CellValue::Bool(true)));
        assert_eq!(Field::Discount.coerce(&json!("yes")), Ok(CellValue::Bool(false)));
        assert_eq!(Field::Discount.coerce(&json!(1)), Ok(CellValue::Bool(false)));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quantity_coerces_any_integer(n in any::<i64>()) {
                prop_assert_eq!(Field::Quantity.coerce(&json!(n)), Ok(CellValue::Integer(n)));
                prop_assert_eq!(
                    Field::Quantity.coerce(&json!(n.to_string())),
                    Ok(CellValue::Integer(n))
                );
            }

            #[test]
            fn discount_normalizes_nonzero_as_true(n in any::<i64>()) {
                prop_assert_eq!(
                    Column::Discount.normalize(&ColumnValue::Integer(n)),
                    Some(CellValue::Bool(n != 0))
                );
            }
        }
    }
}
