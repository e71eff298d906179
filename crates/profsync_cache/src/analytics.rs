//! Cache analytics and tuning recommendations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate statistics for one section of the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStats {
    /// Number of entries in the section.
    pub entry_count: usize,
    /// Total payload bytes in the section.
    pub total_bytes: u64,
    /// Sum of access counts across the section's entries.
    pub access_count: u64,
}

/// A heuristic tuning suggestion derived from cache behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Recommendation {
    /// Hit rate is below the configured threshold; entries expire or are
    /// evicted before being reused.
    IncreaseTtl {
        /// The observed hit rate.
        hit_rate_pct: u8,
    },
    /// The cache is close to its byte ceiling.
    AggressiveCleanup {
        /// Current utilization as a percentage of the ceiling.
        utilization_pct: u8,
    },
    /// Many distinct sections are cached; callers should prioritize.
    PrioritizeSections {
        /// The number of distinct sections observed.
        section_count: usize,
    },
}

/// A point-in-time view of cache effectiveness.
///
/// Hit and miss rates are computed from cumulative counters since the
/// last explicit reset, not from an instantaneous window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheAnalytics {
    /// Fraction of lookups that hit, `0.0..=1.0`.
    pub hit_rate: f64,
    /// Fraction of lookups that missed, `0.0..=1.0`.
    pub miss_rate: f64,
    /// Total payload bytes currently cached.
    pub total_size_bytes: u64,
    /// Number of entries currently cached.
    pub entry_count: usize,
    /// Per-section aggregates, keyed by section name.
    pub sections: BTreeMap<String, SectionStats>,
    /// Heuristic tuning suggestions.
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_serialization() {
        let rec = Recommendation::IncreaseTtl { hit_rate_pct: 42 };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("increase-ttl"));

        let back: Recommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
