//! Error types for the sync engine.

use sheetsync_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur inside the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Mirror API or network error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// No usable credential for the mirror.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// The mirror returned something the engine cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Authoritative store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The event queue has no consumer left.
    #[error("event queue closed")]
    QueueClosed,

    /// No mirror client is held.
    #[error("not connected to mirror")]
    NotConnected,

    /// Thread or runtime setup failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(EngineError::transport_retryable("503 from mirror").is_retryable());
        assert!(!EngineError::transport_fatal("400 bad range").is_retryable());
        assert!(!EngineError::QueueClosed.is_retryable());
        assert!(!EngineError::Unauthenticated("no token".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(EngineError::NotConnected.to_string(), "not connected to mirror");
        let err = EngineError::from(StoreError::NotFound("u-1".into()));
        assert!(err.to_string().contains("u-1"));
    }
}
