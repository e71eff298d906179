//! In-memory store for testing and ephemeral state.

use crate::error::{StoreError, StoreResult};
use crate::store::DurableStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory key-value store.
///
/// This store keeps all data in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral engines that do not need persistence across restarts
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Failure injection
///
/// Tests can call [`MemoryStore::fail_next`] to make every subsequent call
/// fail until [`MemoryStore::heal`] is called. This exercises the engine's
/// transient-failure paths without a real I/O fault.
///
/// # Example
///
/// ```rust
/// use profsync_store::{DurableStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("conflict/1", b"{}").unwrap();
/// assert_eq!(store.list_keys("conflict/").unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Clears a previously injected failure.
    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Returns the number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn check_failing(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check_failing()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.check_failing()?;
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_failing()?;
        self.data.write().remove(key);
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.check_failing()?;
        Ok(self
            .data
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", b"one").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some(&b"one"[..]));

        store.set("a", b"two").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some(&b"two"[..]));

        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);

        // Deleting a missing key is not an error.
        store.delete("a").unwrap();
    }

    #[test]
    fn list_keys_by_prefix() {
        let store = MemoryStore::new();
        store.set("queue/1", b"x").unwrap();
        store.set("queue/2", b"y").unwrap();
        store.set("conflict/1", b"z").unwrap();

        let keys = store.list_keys("queue/").unwrap();
        assert_eq!(keys, vec!["queue/1".to_string(), "queue/2".to_string()]);

        assert_eq!(store.list_keys("").unwrap().len(), 3);
        assert!(store.list_keys("missing/").unwrap().is_empty());
    }

    #[test]
    fn failure_injection() {
        let store = MemoryStore::new();
        store.set("a", b"1").unwrap();

        store.fail_next();
        assert!(store.get("a").is_err());
        assert!(store.set("b", b"2").is_err());
        assert!(store.list_keys("").is_err());

        store.heal();
        // State before the failure is intact.
        assert_eq!(store.get("a").unwrap().as_deref(), Some(&b"1"[..]));
        assert_eq!(store.len(), 1);
    }
}
