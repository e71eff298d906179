//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for one user's sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The user whose profile this engine owns.
    pub user_id: String,
    /// Retry bound applied to operations that do not specify their own.
    pub default_max_retries: u32,
    /// How long after the last successful drain the cache counts as
    /// stale for `can_sync`.
    pub staleness_tolerance: Duration,
    /// Per-operation delivery timeout, enforced by the endpoint
    /// implementation; the engine treats a timeout as a transient
    /// failure.
    pub op_timeout: Duration,
    /// Whether pending work is persisted to the durable store.
    pub persist: bool,
}

impl EngineConfig {
    /// Creates a configuration for `user_id` with defaults.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            default_max_retries: 3,
            staleness_tolerance: Duration::from_secs(300),
            op_timeout: Duration::from_secs(30),
            persist: true,
        }
    }

    /// Sets the default retry bound.
    #[must_use]
    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    /// Sets the staleness tolerance.
    #[must_use]
    pub fn with_staleness_tolerance(mut self, tolerance: Duration) -> Self {
        self.staleness_tolerance = tolerance;
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Disables durable persistence of pending work.
    #[must_use]
    pub fn without_persistence(mut self) -> Self {
        self.persist = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = EngineConfig::new("user-1")
            .with_default_max_retries(5)
            .with_staleness_tolerance(Duration::from_secs(60))
            .with_op_timeout(Duration::from_secs(10))
            .without_persistence();

        assert_eq!(config.user_id, "user-1");
        assert_eq!(config.default_max_retries, 5);
        assert_eq!(config.staleness_tolerance, Duration::from_secs(60));
        assert_eq!(config.op_timeout, Duration::from_secs(10));
        assert!(!config.persist);
    }
}
