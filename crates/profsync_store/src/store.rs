//! Durable store trait definition.

use crate::error::StoreResult;

/// A durable key-value store consumed by the offline engine.
///
/// Stores are **opaque byte stores**. They provide simple keyed operations
/// for reading, writing, deleting, and listing data. The engine owns all
/// payload interpretation - stores do not understand queued operations,
/// conflicts, or cache entries.
///
/// # Invariants
///
/// - `get` returns exactly the bytes previously written under that key
/// - `set` overwrites any existing value for the key
/// - `delete` on a missing key is not an error
/// - `list_keys` returns every key that starts with the given prefix
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Failure semantics
///
/// Any call may fail with [`crate::StoreError::Io`]. Callers treat such
/// failures as transient and must keep their in-memory state consistent.
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent state
pub trait DurableStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs or the key cannot be
    /// represented by the backend.
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Removes the value stored under `key`.
    ///
    /// Deleting a missing key succeeds without effect.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Lists all keys beginning with `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}
