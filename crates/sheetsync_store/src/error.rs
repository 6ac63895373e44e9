//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Row not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data does not match the expected shape.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::NotFound("product u-1".into());
        assert_eq!(err.to_string(), "not found: product u-1");
    }
}
