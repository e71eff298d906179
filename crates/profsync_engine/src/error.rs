//! Error types for the sync engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `drain` was called while the network probe reports offline.
    #[error("cannot drain while offline")]
    Offline,

    /// `drain` was called while another drain is in progress.
    #[error("drain already in progress")]
    DrainInProgress,

    /// An operation priority was outside `1..=10`.
    #[error("priority {0} outside 1..=10")]
    InvalidPriority(u8),

    /// The remote endpoint failed at the transport level.
    #[error("endpoint error: {message}")]
    Endpoint {
        /// Error message.
        message: String,
        /// Whether the delivery can be retried.
        retryable: bool,
    },

    /// A delivery exceeded the per-operation timeout.
    #[error("operation timed out")]
    Timeout,

    /// A cache operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] profsync_cache::CacheError),

    /// A durable store operation failed.
    #[error("store error: {0}")]
    Store(#[from] profsync_store::StoreError),

    /// Encoding an operation or value failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Creates a retryable endpoint error.
    pub fn endpoint_retryable(message: impl Into<String>) -> Self {
        Self::Endpoint {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable endpoint error.
    pub fn endpoint_fatal(message: impl Into<String>) -> Self {
        Self::Endpoint {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a delivery that failed with this error can be
    /// retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Endpoint { retryable, .. } => *retryable,
            EngineError::Timeout | EngineError::Store(_) => true,
            _ => false,
        }
    }
}
