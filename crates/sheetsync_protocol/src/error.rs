//! Error types for protocol decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding records or payloads.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The change action string is not one of insert, update, delete.
    #[error("unknown change action: {0}")]
    UnknownAction(String),

    /// The record has no row image at all.
    #[error("row change for table {table} carries no row image")]
    EmptyRowChange {
        /// Table the record belongs to.
        table: String,
    },

    /// A payload is not valid JSON for the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}
