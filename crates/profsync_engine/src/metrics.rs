//! Sync metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically accumulating sync counters.
///
/// All counters are atomic and can be read while a drain is in progress.
/// Values only ever grow, except through an explicit [`SyncMetrics::reset`].
#[derive(Debug, Default)]
pub struct SyncMetrics {
    total_sync_count: AtomicU64,
    successful_sync_count: AtomicU64,
    failed_sync_count: AtomicU64,
    conflict_count: AtomicU64,
    auto_resolved_conflicts: AtomicU64,
    manual_resolved_conflicts: AtomicU64,
    total_sync_time_ms: AtomicU64,
    data_transferred_bytes: AtomicU64,
}

/// A point-in-time copy of the counters, with derived averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Drains started.
    pub total_sync_count: u64,
    /// Drains that ended fully synced.
    pub successful_sync_count: u64,
    /// Drains that ended in the failed state.
    pub failed_sync_count: u64,
    /// Conflicts detected.
    pub conflict_count: u64,
    /// Conflicts resolved automatically by the active strategy.
    pub auto_resolved_conflicts: u64,
    /// Conflicts resolved by an explicit caller action.
    pub manual_resolved_conflicts: u64,
    /// Mean drain duration across all drains.
    pub average_sync_time_ms: u64,
    /// Total operation payload bytes delivered.
    pub data_transferred_bytes: u64,
}

impl SyncMetrics {
    /// Creates zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a drain starting.
    pub(crate) fn record_sync_start(&self) {
        self.total_sync_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a drain that ended fully synced.
    pub(crate) fn record_sync_success(&self, elapsed_ms: u64) {
        self.successful_sync_count.fetch_add(1, Ordering::Relaxed);
        self.total_sync_time_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    /// Records a drain that ended failed.
    pub(crate) fn record_sync_failure(&self, elapsed_ms: u64) {
        self.failed_sync_count.fetch_add(1, Ordering::Relaxed);
        self.total_sync_time_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    /// Records a drain that ended in any other state.
    pub(crate) fn record_sync_elapsed(&self, elapsed_ms: u64) {
        self.total_sync_time_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    /// Records a detected conflict.
    pub(crate) fn record_conflict(&self) {
        self.conflict_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an automatic resolution.
    pub(crate) fn record_auto_resolution(&self) {
        self.auto_resolved_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a manual resolution.
    pub(crate) fn record_manual_resolution(&self) {
        self.manual_resolved_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records delivered payload bytes.
    pub(crate) fn record_bytes_transferred(&self, bytes: u64) {
        self.data_transferred_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_sync_count.load(Ordering::Relaxed);
        let total_time = self.total_sync_time_ms.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_sync_count: total,
            successful_sync_count: self.successful_sync_count.load(Ordering::Relaxed),
            failed_sync_count: self.failed_sync_count.load(Ordering::Relaxed),
            conflict_count: self.conflict_count.load(Ordering::Relaxed),
            auto_resolved_conflicts: self.auto_resolved_conflicts.load(Ordering::Relaxed),
            manual_resolved_conflicts: self.manual_resolved_conflicts.load(Ordering::Relaxed),
            average_sync_time_ms: if total == 0 { 0 } else { total_time / total },
            data_transferred_bytes: self.data_transferred_bytes.load(Ordering::Relaxed),
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.total_sync_count.store(0, Ordering::Relaxed);
        self.successful_sync_count.store(0, Ordering::Relaxed);
        self.failed_sync_count.store(0, Ordering::Relaxed);
        self.conflict_count.store(0, Ordering::Relaxed);
        self.auto_resolved_conflicts.store(0, Ordering::Relaxed);
        self.manual_resolved_conflicts.store(0, Ordering::Relaxed);
        self.total_sync_time_ms.store(0, Ordering::Relaxed);
        self.data_transferred_bytes.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = SyncMetrics::new();
        metrics.record_sync_start();
        metrics.record_sync_success(100);
        metrics.record_sync_start();
        metrics.record_sync_failure(300);
        metrics.record_conflict();
        metrics.record_auto_resolution();
        metrics.record_bytes_transferred(512);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_sync_count, 2);
        assert_eq!(snap.successful_sync_count, 1);
        assert_eq!(snap.failed_sync_count, 1);
        assert_eq!(snap.conflict_count, 1);
        assert_eq!(snap.auto_resolved_conflicts, 1);
        assert_eq!(snap.average_sync_time_ms, 200);
        assert_eq!(snap.data_transferred_bytes, 512);
    }

    #[test]
    fn reset_zeroes_everything() {
        let metrics = SyncMetrics::new();
        metrics.record_sync_start();
        metrics.record_conflict();
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn average_with_no_syncs_is_zero() {
        assert_eq!(SyncMetrics::new().snapshot().average_sync_time_ms, 0);
    }
}
