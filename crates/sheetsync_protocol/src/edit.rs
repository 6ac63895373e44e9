//! Field-level edits coming back from the mirror.

use crate::attribution::Attribution;
use crate::error::ProtocolResult;
use crate::schema::Field;
use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell edit as reported by the mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEdit {
    /// Logical row key.
    #[serde(default)]
    pub uuid: String,
    /// Mirror header label of the edited column.
    #[serde(default)]
    pub field: String,
    /// Raw cell value.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Identity of the editor.
    #[serde(default)]
    pub user_email: String,
}

/// Decodes a batch body that is either an array of edits or a single edit.
///
/// The array form is tried first.
pub fn decode_batch(body: &[u8]) -> ProtocolResult<Vec<FieldEdit>> {
    match serde_json::from_slice::<Vec<FieldEdit>>(body) {
        Ok(edits) => Ok(edits),
        Err(_) => {
            let single: FieldEdit = serde_json::from_slice(body)?;
            Ok(vec![single])
        }
    }
}

/// Why an edit was excluded from a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRejection {
    /// The row key is empty.
    MissingKey,
    /// The field label is empty.
    MissingField,
    /// The field label is not whitelisted.
    UnknownField(String),
    /// The value cannot be coerced to the field's type.
    InvalidValue {
        /// Field being edited.
        field: Field,
        /// Coercion failure.
        reason: String,
    },
    /// The edit claims the engine's own identity.
    SentinelActor,
}

impl fmt::Display for EditRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditRejection::MissingKey => f.write_str("missing row key"),
            EditRejection::MissingField => f.write_str("missing field"),
            EditRejection::UnknownField(label) => write!(f, "field not editable: {label}"),
            EditRejection::InvalidValue { field, reason } => {
                write!(f, "invalid value for {}: {reason}", field.label())
            }
            EditRejection::SentinelActor => f.write_str("edit claims the sync identity"),
        }
    }
}

/// An edit that passed validation and is ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEdit {
    /// Logical row key.
    pub key: String,
    /// Whitelisted field.
    pub field: Field,
    /// Typed value.
    pub value: CellValue,
    /// Real actor identity.
    pub actor: Attribution,
}

impl FieldEdit {
    /// Creates an edit.
    pub fn new(
        uuid: impl Into<String>,
        field: impl Into<String>,
        value: serde_json::Value,
        user_email: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            field: field.into(),
            value,
            user_email: user_email.into(),
        }
    }

    /// Validates the edit against the whitelist and coerces its value.
    pub fn resolve(&self) -> Result<ResolvedEdit, EditRejection> {
        if self.uuid.is_empty() {
            return Err(EditRejection::MissingKey);
        }
        if self.field.is_empty() {
            return Err(EditRejection::MissingField);
        }
        let field = Field::from_label(&self.field)
            .ok_or_else(|| EditRejection::UnknownField(self.field.clone()))?;
        let actor = Attribution::from_actor(Some(&self.user_email));
        if actor.is_sentinel() {
            return Err(EditRejection::SentinelActor);
        }
        let value = field
            .coerce(&self.value)
            .map_err(|reason| EditRejection::InvalidValue { field, reason })?;

        Ok(ResolvedEdit {
            key: self.uuid.clone(),
            field,
            value,
            actor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_array() {
        let body = br#"[{"uuid":"a","field":"Price","value":12.5,"user_email":"ana@example.com"},
                        {"uuid":"","field":"Quantity","value":3}]"#;
        let edits = decode_batch(body).unwrap();
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].uuid, "a");
        assert_eq!(edits[1].user_email, "");
    }

    #[test]
    fn decode_single_object() {
        let single = br#"{"uuid":"a","field":"Price","value":12.5}"#;
        let array = br#"[{"uuid":"a","field":"Price","value":12.5}]"#;
        assert_eq!(decode_batch(single).unwrap(), decode_batch(array).unwrap());
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(decode_batch(b"not json").is_err());
        assert!(decode_batch(b"[1, 2]").is_err());
    }

    #[test]
    fn resolve_defaults_actor_to_system() {
        let edit = FieldEdit::new("a", "Price", json!(12.5), "");
        let resolved = edit.resolve().unwrap();
        assert_eq!(resolved.field, Field::Price);
        assert_eq!(resolved.value, CellValue::Float(12.5));
        assert_eq!(resolved.actor, Attribution::system());
    }

    #[test]
    fn resolve_rejections() {
        assert_eq!(
            FieldEdit::new("", "Quantity", json!(3), "").resolve(),
            Err(EditRejection::MissingKey)
        );
        assert_eq!(
            FieldEdit::new("a", "", json!(3), "").resolve(),
            Err(EditRejection::MissingField)
        );
        assert_eq!(
            FieldEdit::new("a", "uuid", json!("b"), "").resolve(),
            Err(EditRejection::UnknownField("uuid".into()))
        );
        assert_eq!(
            FieldEdit::new("a", "Price", json!(1), crate::SENTINEL).resolve(),
            Err(EditRejection::SentinelActor)
        );
        assert!(matches!(
            FieldEdit::new("a", "Quantity", json!("many"), "").resolve(),
            Err(EditRejection::InvalidValue { field: Field::Quantity, .. })
        ));
    }
}
