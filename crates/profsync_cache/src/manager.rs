//! The cache manager.

use crate::analytics::{CacheAnalytics, Recommendation, SectionStats};
use crate::config::CacheConfig;
use crate::entry::{section_of, CacheEntry, CachePriority, Provenance};
use crate::error::{CacheError, CacheResult};
use parking_lot::RwLock;
use profsync_protocol::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Why a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No entry exists for the key.
    NotFound,
    /// An entry existed but was past its TTL; it has been removed.
    Expired,
}

/// The result of a cache lookup.
///
/// A miss is not an error; it is a normal, typed outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The key was found and is fresh.
    Hit(CacheEntry),
    /// The key was absent or expired.
    Miss(MissReason),
}

impl Lookup {
    /// Returns the entry if this is a hit.
    #[must_use]
    pub fn entry(self) -> Option<CacheEntry> {
        match self {
            Lookup::Hit(entry) => Some(entry),
            Lookup::Miss(_) => None,
        }
    }
}

/// What a cleanup pass reclaimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries removed (expired plus evicted).
    pub entries_removed: usize,
    /// Payload bytes freed.
    pub bytes_freed: u64,
}

/// A full per-user export of cache contents, for data-portability
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheExport {
    /// Every live entry belonging to the user.
    pub entries: Vec<CacheEntry>,
    /// Analytics at export time.
    pub analytics: CacheAnalytics,
}

/// A bounded, TTL- and priority-aware key/value cache.
///
/// One instance serves one user profile. All mutable state is guarded by
/// a single lock, so concurrent callers see serialized operations.
pub struct CacheManager {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    total_bytes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    /// Creates a cache manager with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            total_bytes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Stores a confirmed value under `key`.
    ///
    /// Overwrites any existing entry. `ttl` of `None` applies the
    /// configured default; a zero `ttl` is a contract violation.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTtl`] for a zero TTL and
    /// [`CacheError::InvalidKey`] for a key without a
    /// `{user_id}/{section}` shape.
    pub fn set(
        &self,
        key: &str,
        payload: Vec<u8>,
        ttl: Option<Duration>,
        priority: CachePriority,
    ) -> CacheResult<CacheEntry> {
        self.set_with_provenance(key, payload, ttl, priority, Provenance::Confirmed)
    }

    /// Stores a value with an explicit provenance.
    ///
    /// The sync engine uses this to write `Optimistic` entries for
    /// locally queued mutations.
    ///
    /// # Errors
    ///
    /// Same contract as [`CacheManager::set`].
    pub fn set_with_provenance(
        &self,
        key: &str,
        payload: Vec<u8>,
        ttl: Option<Duration>,
        priority: CachePriority,
        provenance: Provenance,
    ) -> CacheResult<CacheEntry> {
        let ttl = match ttl {
            Some(d) if d.is_zero() => return Err(CacheError::InvalidTtl),
            Some(d) => d,
            None => self.config.default_ttl,
        };
        if section_of(key).is_none() {
            return Err(CacheError::InvalidKey(key.to_string()));
        }

        let now = Timestamp::now();
        let size_bytes = payload.len() as u64;
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            size_bytes,
            created_at: now,
            expires_at: Timestamp::from_millis(
                now.as_millis().saturating_add(ttl.as_millis() as u64),
            ),
            last_accessed_at: now,
            access_count: 0,
            priority,
            provenance,
        };

        let mut entries = self.entries.write();
        if let Some(old) = entries.insert(key.to_string(), entry.clone()) {
            self.total_bytes.fetch_sub(old.size_bytes, Ordering::Relaxed);
        }
        self.total_bytes
            .fetch_add(entry.size_bytes, Ordering::Relaxed);
        Ok(entry)
    }

    /// Looks up `key`.
    ///
    /// A hit bumps the entry's access bookkeeping. An expired entry is
    /// removed as a side effect and reported as `Miss(Expired)`.
    pub fn get(&self, key: &str) -> Lookup {
        let now = Timestamp::now();
        let mut entries = self.entries.write();

        match entries.get_mut(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss(MissReason::NotFound)
            }
            Some(entry) if entry.is_expired(now) => {
                let removed = entries.remove(key).map(|e| e.size_bytes).unwrap_or(0);
                self.total_bytes.fetch_sub(removed, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "expired entry removed on lookup");
                Lookup::Miss(MissReason::Expired)
            }
            Some(entry) => {
                entry.last_accessed_at = now;
                entry.access_count += 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Hit(entry.clone())
            }
        }
    }

    /// Removes the entry for `key`. Returns true if one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.write().remove(key);
        if let Some(entry) = &removed {
            self.total_bytes
                .fetch_sub(entry.size_bytes, Ordering::Relaxed);
        }
        removed.is_some()
    }

    /// Marks the entry for `key` as server-confirmed.
    ///
    /// Returns true if an entry existed. Called by the sync engine when a
    /// drain acknowledges the mutation that wrote the optimistic value.
    pub fn confirm(&self, key: &str) -> bool {
        match self.entries.write().get_mut(key) {
            Some(entry) => {
                entry.provenance = Provenance::Confirmed;
                true
            }
            None => false,
        }
    }

    /// Removes expired entries, then evicts least-recently-used entries
    /// until the cache fits under its byte ceiling.
    ///
    /// Eviction order is ascending `last_accessed_at`, ties broken by
    /// lowest `access_count`.
    pub fn cleanup(&self) -> CleanupReport {
        let now = Timestamp::now();
        let mut report = CleanupReport::default();
        let mut entries = self.entries.write();

        // Phase 1: reclaim expired entries.
        let expired: Vec<String> = entries
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.key.clone())
            .collect();
        for key in expired {
            if let Some(entry) = entries.remove(&key) {
                report.entries_removed += 1;
                report.bytes_freed += entry.size_bytes;
                self.total_bytes
                    .fetch_sub(entry.size_bytes, Ordering::Relaxed);
            }
        }

        // Phase 2: evict to the ceiling, oldest access first.
        if self.total_bytes.load(Ordering::Relaxed) > self.config.max_bytes {
            let mut candidates: Vec<(Timestamp, u64, String)> = entries
                .values()
                .map(|e| (e.last_accessed_at, e.access_count, e.key.clone()))
                .collect();
            candidates.sort();

            for (_, _, key) in candidates {
                if self.total_bytes.load(Ordering::Relaxed) <= self.config.max_bytes {
                    break;
                }
                if let Some(entry) = entries.remove(&key) {
                    report.entries_removed += 1;
                    report.bytes_freed += entry.size_bytes;
                    self.total_bytes
                        .fetch_sub(entry.size_bytes, Ordering::Relaxed);
                    warn!(key, size = entry.size_bytes, "evicted under memory pressure");
                }
            }
        }

        debug!(
            removed = report.entries_removed,
            freed = report.bytes_freed,
            "cleanup pass complete"
        );
        report
    }

    /// Computes analytics from cumulative counters and current contents.
    #[must_use]
    pub fn analytics(&self) -> CacheAnalytics {
        let entries = self.entries.read();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        let (hit_rate, miss_rate) = if lookups == 0 {
            (0.0, 0.0)
        } else {
            (hits as f64 / lookups as f64, misses as f64 / lookups as f64)
        };

        let mut sections: BTreeMap<String, SectionStats> = BTreeMap::new();
        for entry in entries.values() {
            if let Some(section) = entry.section() {
                let stats = sections.entry(section.to_string()).or_default();
                stats.entry_count += 1;
                stats.total_bytes += entry.size_bytes;
                stats.access_count += entry.access_count;
            }
        }

        let total_size_bytes = self.total_bytes.load(Ordering::Relaxed);
        let mut recommendations = Vec::new();
        if lookups > 0 && hit_rate < self.config.low_hit_rate_threshold {
            recommendations.push(Recommendation::IncreaseTtl {
                hit_rate_pct: (hit_rate * 100.0) as u8,
            });
        }
        let utilization = total_size_bytes as f64 / self.config.max_bytes as f64;
        if utilization > self.config.high_utilization_threshold {
            recommendations.push(Recommendation::AggressiveCleanup {
                utilization_pct: (utilization * 100.0).min(u8::MAX as f64) as u8,
            });
        }
        if sections.len() > self.config.section_count_threshold {
            recommendations.push(Recommendation::PrioritizeSections {
                section_count: sections.len(),
            });
        }

        CacheAnalytics {
            hit_rate,
            miss_rate,
            total_size_bytes,
            entry_count: entries.len(),
            sections,
            recommendations,
        }
    }

    /// Resets the cumulative hit/miss counters.
    pub fn reset_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Exports every live entry belonging to `user_id`, with analytics.
    #[must_use]
    pub fn export_all(&self, user_id: &str) -> CacheExport {
        let prefix = format!("{user_id}/");
        let mut entries: Vec<CacheEntry> = self
            .entries
            .read()
            .values()
            .filter(|e| e.key.starts_with(&prefix))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        CacheExport {
            entries,
            analytics: self.analytics(),
        }
    }

    /// Deletes every entry belonging to `user_id`.
    pub fn delete_all(&self, user_id: &str) {
        let prefix = format!("{user_id}/");
        let mut entries = self.entries.write();
        let doomed: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in doomed {
            if let Some(entry) = entries.remove(&key) {
                self.total_bytes
                    .fetch_sub(entry.size_bytes, Ordering::Relaxed);
            }
        }
    }

    /// Returns the current total payload size in bytes.
    #[must_use]
    pub fn total_size_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Returns the current entry count.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }
}
