//! # ProfSync Cache
//!
//! Adaptive TTL- and priority-aware cache for ProfSync.
//!
//! This crate provides:
//! - Bounded key/value cache with lazy expiration
//! - LRU eviction to a byte ceiling (tie-break by access count)
//! - Device-aware warm-up planning (memory, connection type, sync load)
//! - Hit/miss analytics with tuning recommendations
//! - Per-user export and deletion for data-portability requests
//!
//! ## Key layout
//!
//! Cache keys are `{user_id}/{section}` or `{user_id}/{section}/{rest}`.
//! The section segment drives per-section analytics and warm-up.
//!
//! ## Correctness model
//!
//! Expiration is lazy: an expired entry is removed when a `get` finds it,
//! so no background sweep is required. A periodic [`CacheManager::cleanup`]
//! call (e.g. once per foreground session) bounds memory proactively.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod analytics;
mod config;
mod entry;
mod error;
mod manager;
mod warm;

pub use analytics::{CacheAnalytics, Recommendation, SectionStats};
pub use config::CacheConfig;
pub use entry::{CacheEntry, CachePriority, Provenance};
pub use error::{CacheError, CacheResult};
pub use manager::{CacheExport, CacheManager, CleanupReport, Lookup, MissReason};
pub use warm::{plan_warm_sections, DeviceCapabilities, SectionLoader, SyncLoad};
