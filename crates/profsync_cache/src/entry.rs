//! Cache entries and their metadata.

use profsync_protocol::Timestamp;
use serde::{Deserialize, Serialize};

/// Retention priority of a cache entry.
///
/// Priority does not affect expiration or LRU order today; it records how
/// the entry was populated (warm-up stores at `High`) and is exported for
/// observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePriority {
    /// Opportunistic data, first to go.
    Low,
    /// Default.
    Medium,
    /// Warm-up and recently mutated data.
    High,
    /// Data the UI cannot render without.
    Critical,
}

/// Whether an entry's value has been acknowledged by the server.
///
/// The engine writes `Optimistic` entries when it queues a mutation
/// offline and confirms them when the drain acknowledges the operation,
/// so UI layers can render pending-state affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// The server has acknowledged this value.
    Confirmed,
    /// A locally queued mutation produced this value; the server has not
    /// seen it yet.
    Optimistic,
}

/// A single cached value with its bookkeeping.
///
/// Owned exclusively by the cache manager; mutated only through its API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The entry's key, `{user_id}/{section}[/{rest}]`.
    pub key: String,
    /// The cached bytes.
    pub payload: Vec<u8>,
    /// Size of the payload in bytes.
    pub size_bytes: u64,
    /// When the entry was created.
    pub created_at: Timestamp,
    /// When the entry expires.
    pub expires_at: Timestamp,
    /// Last time a `get` hit this entry.
    pub last_accessed_at: Timestamp,
    /// Number of `get` hits.
    pub access_count: u64,
    /// Retention priority.
    pub priority: CachePriority,
    /// Whether the server has acknowledged this value.
    pub provenance: Provenance,
}

impl CacheEntry {
    /// Returns true if the entry is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Returns the section segment of the key, if the key has one.
    #[must_use]
    pub fn section(&self) -> Option<&str> {
        section_of(&self.key)
    }
}

/// Extracts the section segment from a `{user_id}/{section}[/{rest}]` key.
#[must_use]
pub(crate) fn section_of(key: &str) -> Option<&str> {
    let mut parts = key.splitn(3, '/');
    let _user = parts.next()?;
    parts.next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, expires_at: u64) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            payload: vec![1, 2, 3],
            size_bytes: 3,
            created_at: Timestamp::from_millis(0),
            expires_at: Timestamp::from_millis(expires_at),
            last_accessed_at: Timestamp::from_millis(0),
            access_count: 0,
            priority: CachePriority::Medium,
            provenance: Provenance::Confirmed,
        }
    }

    #[test]
    fn expiry_boundary() {
        let e = entry("u1/profile", 1_000);
        assert!(!e.is_expired(Timestamp::from_millis(999)));
        assert!(e.is_expired(Timestamp::from_millis(1_000)));
        assert!(e.is_expired(Timestamp::from_millis(1_001)));
    }

    #[test]
    fn section_extraction() {
        assert_eq!(entry("u1/profile", 0).section(), Some("profile"));
        assert_eq!(entry("u1/posts/42", 0).section(), Some("posts"));
        assert_eq!(entry("u1", 0).section(), None);
        assert_eq!(entry("u1/", 0).section(), None);
    }

    #[test]
    fn priority_ordering() {
        assert!(CachePriority::Low < CachePriority::Medium);
        assert!(CachePriority::High < CachePriority::Critical);
    }
}
