//! Error types for the request handlers.

use sheetsync_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The endpoint does not accept this method.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// No handler is registered for the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The batch holds more edits than configured.
    #[error("batch of {size} edits exceeds the limit of {limit}")]
    BatchTooLarge {
        /// Edits received.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Store error, including a failed begin or commit.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::MethodNotAllowed(_)
                | ServerError::NotFound(_)
                | ServerError::BatchTooLarge { .. }
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Store(_) | ServerError::Internal(_))
    }

    /// HTTP status code for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::MethodNotAllowed(_) => 405,
            ServerError::NotFound(_) => 404,
            ServerError::InvalidRequest(_) | ServerError::BatchTooLarge { .. } => 400,
            ServerError::Store(_) | ServerError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
        assert!(ServerError::Store(StoreError::NotFound("x".into())).is_server_error());
    }

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::MethodNotAllowed("GET".into()).status_code(), 405);
        assert_eq!(ServerError::InvalidRequest("bad".into()).status_code(), 400);
        assert_eq!(ServerError::BatchTooLarge { size: 2, limit: 1 }.status_code(), 400);
        assert_eq!(ServerError::Internal("oops".into()).status_code(), 500);
    }

    #[test]
    fn error_display() {
        let err = ServerError::BatchTooLarge {
            size: 1200,
            limit: 1000,
        };
        let msg = err.to_string();
        assert!(msg.contains("1200"));
        assert!(msg.contains("1000"));
    }
}
