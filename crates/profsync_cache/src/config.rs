//! Configuration for the cache manager.

use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Configuration for cache behavior.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a caller does not supply one.
    pub default_ttl: Duration,
    /// Byte ceiling; `cleanup` evicts down to this.
    pub max_bytes: u64,
    /// Below this much available device memory, warm-up truncates to
    /// `low_memory_section_limit` sections.
    pub low_memory_threshold: u64,
    /// Maximum sections warmed on a low-memory device.
    pub low_memory_section_limit: usize,
    /// Sections considered heavyweight, skipped on cellular or under
    /// sync pressure.
    pub heavyweight_sections: Vec<String>,
    /// Below this hit rate, analytics recommends longer TTLs.
    pub low_hit_rate_threshold: f64,
    /// Above this fraction of `max_bytes`, analytics recommends more
    /// aggressive cleanup.
    pub high_utilization_threshold: f64,
    /// Above this many distinct sections, analytics recommends
    /// prioritization.
    pub section_count_threshold: usize,
}

impl CacheConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_bytes: 50 * MIB,
            low_memory_threshold: 50 * MIB,
            low_memory_section_limit: 3,
            heavyweight_sections: vec!["analytics".to_string(), "detailed_settings".to_string()],
            low_hit_rate_threshold: 0.7,
            high_utilization_threshold: 0.8,
            section_count_threshold: 10,
        }
    }

    /// Sets the default TTL.
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the byte ceiling.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the low-memory threshold.
    #[must_use]
    pub fn with_low_memory_threshold(mut self, threshold: u64) -> Self {
        self.low_memory_threshold = threshold;
        self
    }

    /// Sets the heavyweight section list.
    #[must_use]
    pub fn with_heavyweight_sections(mut self, sections: Vec<String>) -> Self {
        self.heavyweight_sections = sections;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}
