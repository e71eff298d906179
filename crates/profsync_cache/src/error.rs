//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A caller passed a zero TTL. TTLs must be positive; the cache
    /// rejects rather than clamps.
    #[error("TTL must be positive")]
    InvalidTtl,

    /// A cache key is empty or lacks a `{user_id}/{section}` shape.
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// The injected section loader failed during warm-up.
    #[error("loader failed for section {section}: {message}")]
    Loader {
        /// The section being loaded.
        section: String,
        /// The loader's error description.
        message: String,
    },
}
