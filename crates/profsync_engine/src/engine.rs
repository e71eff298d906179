//! The offline sync state machine.

use crate::config::EngineConfig;
use crate::endpoint::RemoteEndpoint;
use crate::error::{EngineError, EngineResult};
use crate::metrics::{MetricsSnapshot, SyncMetrics};
use crate::queue::OperationQueue;
use parking_lot::{Mutex, RwLock};
use profsync_cache::{CacheError, CacheManager, CachePriority, Provenance, SyncLoad};
use profsync_protocol::{
    resolve, values_disagree, ConflictStrategy, NetworkState, OperationPayload, QueuedOperation,
    ResolvedBy, SendOutcome, SyncConflict, Timestamp,
};
use profsync_store::DurableStore;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The authoritative sync status of one user's offline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No pending work; local and remote agree as far as we know.
    Synced,
    /// Operations are queued or the cache is stale.
    Pending,
    /// A drain is in progress.
    Syncing,
    /// At least one conflict awaits resolution.
    Conflicted,
    /// Only permanently-failed operations remain; caller action required.
    Failed,
    /// The network probe reports no connectivity.
    Offline,
}

impl SyncStatus {
    /// Returns true if a new drain may start from this status.
    #[must_use]
    pub fn can_start_drain(&self) -> bool {
        !matches!(self, SyncStatus::Syncing)
    }
}

/// Why a drain stopped before emptying the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The caller's cancellation signal fired.
    Cancelled,
    /// The network probe flipped offline mid-drain.
    WentOffline,
}

/// One transient delivery failure, preserved for observability even when
/// the operation eventually succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientFailure {
    /// The operation that failed.
    pub operation_id: Uuid,
    /// The failure description.
    pub message: String,
    /// The operation's retry count after this failure.
    pub retry_count: u32,
}

/// The outcome of one drain.
#[derive(Debug, Clone)]
pub struct DrainReport {
    /// Operations attempted.
    pub processed: usize,
    /// Operations acknowledged by the server.
    pub succeeded: Vec<Uuid>,
    /// Operations that exhausted retries or failed fatally.
    pub permanently_failed: Vec<Uuid>,
    /// Every transient failure seen, including ones later retried
    /// successfully.
    pub transient_failures: Vec<TransientFailure>,
    /// Conflicts detected and auto-resolved.
    pub conflicts_resolved: Vec<Uuid>,
    /// Conflicts detected and left pending.
    pub conflicts_unresolved: Vec<Uuid>,
    /// Why the drain stopped early, if it did.
    pub stopped: Option<StopReason>,
    /// Wall-clock duration of the drain.
    pub duration: Duration,
    /// The engine status when the drain returned.
    pub final_status: SyncStatus,
}

impl Default for DrainReport {
    fn default() -> Self {
        Self {
            processed: 0,
            succeeded: Vec::new(),
            permanently_failed: Vec::new(),
            transient_failures: Vec::new(),
            conflicts_resolved: Vec::new(),
            conflicts_unresolved: Vec::new(),
            stopped: None,
            duration: Duration::ZERO,
            final_status: SyncStatus::Synced,
        }
    }
}

/// A cloneable cancellation signal for an in-flight drain.
///
/// Checked between operations, never mid-operation.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests that the current drain stop after its current operation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The offline sync engine for one user profile.
///
/// All mutable state lives behind per-instance locks, so concurrent
/// callers see serialized operations; `drain` is the only operation that
/// performs network I/O.
pub struct SyncEngine<E: RemoteEndpoint> {
    config: EngineConfig,
    endpoint: Arc<E>,
    cache: Arc<CacheManager>,
    store: Arc<dyn DurableStore>,
    status: RwLock<SyncStatus>,
    network: RwLock<NetworkState>,
    queue: Mutex<OperationQueue>,
    conflicts: RwLock<Vec<SyncConflict>>,
    failed: RwLock<Vec<QueuedOperation>>,
    strategy: RwLock<ConflictStrategy>,
    metrics: SyncMetrics,
    cancel: CancelHandle,
    cache_stale: AtomicBool,
    last_synced_at: RwLock<Option<Timestamp>>,
}

impl<E: RemoteEndpoint> SyncEngine<E> {
    /// Creates an engine, restoring any persisted pending work.
    pub fn new(
        config: EngineConfig,
        endpoint: E,
        cache: Arc<CacheManager>,
        store: Arc<dyn DurableStore>,
    ) -> Self {
        let engine = Self {
            config,
            endpoint: Arc::new(endpoint),
            cache,
            store,
            status: RwLock::new(SyncStatus::Synced),
            network: RwLock::new(NetworkState::offline()),
            queue: Mutex::new(OperationQueue::new()),
            conflicts: RwLock::new(Vec::new()),
            failed: RwLock::new(Vec::new()),
            strategy: RwLock::new(ConflictStrategy::LastModifiedWins),
            metrics: SyncMetrics::new(),
            cancel: CancelHandle::default(),
            cache_stale: AtomicBool::new(true),
            last_synced_at: RwLock::new(None),
        };
        if engine.config.persist {
            engine.load_persisted();
        }
        engine
    }

    /// Returns the endpoint this engine delivers to.
    #[must_use]
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.status.read()
    }

    /// Returns a snapshot of the sync metrics.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns the last network state reported by the probe.
    #[must_use]
    pub fn network(&self) -> NetworkState {
        self.network.read().clone()
    }

    /// Returns the active conflict strategy.
    #[must_use]
    pub fn strategy(&self) -> ConflictStrategy {
        *self.strategy.read()
    }

    /// Sets the conflict strategy for future conflicts.
    pub fn set_strategy(&self, strategy: ConflictStrategy) {
        *self.strategy.write() = strategy;
    }

    /// Returns the number of queued operations.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns every conflict in the ledger, resolved or not.
    ///
    /// Resolved conflicts stay in the ledger as an archive for history
    /// UIs until [`SyncEngine::clear_resolved_conflicts`] prunes them.
    #[must_use]
    pub fn conflicts(&self) -> Vec<SyncConflict> {
        self.conflicts.read().clone()
    }

    /// Drops resolved conflicts from the ledger, keeping unresolved ones.
    ///
    /// Returns how many were dropped. Their durable records were already
    /// deleted at resolution time.
    pub fn clear_resolved_conflicts(&self) -> usize {
        let mut conflicts = self.conflicts.write();
        let before = conflicts.len();
        conflicts.retain(|c| !c.is_resolved());
        before - conflicts.len()
    }

    /// Returns the conflicts still awaiting resolution.
    #[must_use]
    pub fn unresolved_conflicts(&self) -> Vec<SyncConflict> {
        self.conflicts
            .read()
            .iter()
            .filter(|c| !c.is_resolved())
            .cloned()
            .collect()
    }

    /// Returns the permanently-failed operations awaiting caller action.
    #[must_use]
    pub fn failed_operations(&self) -> Vec<QueuedOperation> {
        self.failed.read().clone()
    }

    /// Returns a cancellation handle for in-flight drains.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Current queue pressure, fed into cache warm-up planning.
    #[must_use]
    pub fn sync_load(&self) -> SyncLoad {
        SyncLoad {
            queue_depth: self.queue.lock().len(),
            has_unresolved_conflicts: self.conflicts.read().iter().any(|c| !c.is_resolved()),
        }
    }

    /// Marks the cache stale, making `can_sync` true once online.
    pub fn mark_cache_stale(&self) {
        self.cache_stale.store(true, Ordering::SeqCst);
    }

    /// Applies a network probe update.
    ///
    /// An offline report moves the engine to `Offline` from any state; an
    /// in-flight drain notices before initiating its next operation and
    /// leaves the remaining queue untouched. An offline-to-online flip
    /// moves to `Pending` when work is queued, otherwise `Synced`.
    pub fn set_network(&self, state: NetworkState) {
        let was_online = {
            let mut network = self.network.write();
            let was = network.online;
            *network = state.clone();
            was
        };

        if !state.online {
            *self.status.write() = SyncStatus::Offline;
            info!(user = %self.config.user_id, "network probe reports offline");
        } else if !was_online {
            let next = if self.queue.lock().is_empty() {
                SyncStatus::Synced
            } else {
                SyncStatus::Pending
            };
            *self.status.write() = next;
            info!(user = %self.config.user_id, status = ?next, "connectivity restored");
        }
    }

    /// Queues a profile mutation.
    ///
    /// The operation is persisted, an optimistic cache entry is written
    /// for each field it touches, and the status moves to `Pending`
    /// unless the engine is mid-drain or offline.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPriority`] for a priority outside
    /// `1..=10`; no state is mutated in that case.
    pub fn queue(
        &self,
        payload: OperationPayload,
        priority: u8,
        user_initiated: bool,
    ) -> EngineResult<QueuedOperation> {
        let operation = QueuedOperation::new(payload, priority, user_initiated)
            .ok_or(EngineError::InvalidPriority(priority))?
            .with_max_retries(self.config.default_max_retries);

        // Cache writes validate first so a rejected operation leaves no
        // durable ghost record behind.
        self.write_optimistic(&operation)?;
        self.persist_operation(&operation);
        self.queue.lock().push(operation.clone());

        {
            let mut status = self.status.write();
            if !matches!(*status, SyncStatus::Syncing | SyncStatus::Offline) {
                *status = SyncStatus::Pending;
            }
        }
        debug!(
            id = %operation.id,
            kind = ?operation.kind(),
            priority = operation.priority,
            "operation queued"
        );
        Ok(operation)
    }

    /// Returns true if a drain would do useful work right now.
    #[must_use]
    pub fn can_sync(&self) -> bool {
        let online = self.network.read().online;
        let status = *self.status.read();
        let stale = self.cache_stale.load(Ordering::SeqCst)
            || match *self.last_synced_at.read() {
                Some(at) => at.elapsed_until(Timestamp::now()) > self.config.staleness_tolerance,
                None => true,
            };
        let has_work = !self.queue.lock().is_empty() || stale;
        online && status != SyncStatus::Syncing && has_work
    }

    /// Drains the queue against the remote endpoint.
    ///
    /// Operations go out in priority order. A retried operation waits for
    /// the next drain; cancellation and offline flips are honored between
    /// operations, leaving the remaining queue untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Offline`] when the probe reports offline
    /// and [`EngineError::DrainInProgress`] when a drain is already
    /// running. Neither mutates any state.
    pub fn drain(&self) -> EngineResult<DrainReport> {
        if !self.network.read().online {
            return Err(EngineError::Offline);
        }
        {
            let mut status = self.status.write();
            if *status == SyncStatus::Syncing {
                return Err(EngineError::DrainInProgress);
            }
            *status = SyncStatus::Syncing;
        }

        self.cancel.reset();
        self.metrics.record_sync_start();
        let start = Instant::now();
        let mut report = DrainReport::default();
        let mut attempted: HashSet<Uuid> = HashSet::new();

        loop {
            if self.cancel.is_cancelled() {
                report.stopped = Some(StopReason::Cancelled);
                break;
            }
            if !self.network.read().online {
                report.stopped = Some(StopReason::WentOffline);
                break;
            }

            let popped = self.queue.lock().pop();
            let Some(operation) = popped else { break };

            if attempted.contains(&operation.id) {
                // Wrapped around to an operation retried this drain;
                // it waits for the next one.
                self.queue.lock().push_front(operation);
                break;
            }
            attempted.insert(operation.id);
            report.processed += 1;

            match self.endpoint.send(&operation) {
                Ok(SendOutcome::Ok { .. }) => self.handle_success(&operation, &mut report),
                Ok(SendOutcome::Conflict {
                    field_name,
                    server_value,
                    server_timestamp,
                }) => self.handle_conflict(
                    &operation,
                    field_name,
                    server_value,
                    server_timestamp,
                    &mut report,
                ),
                Ok(SendOutcome::Error { message, retryable }) => {
                    self.handle_failure(operation, message, retryable, &mut report);
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    self.handle_failure(operation, e.to_string(), retryable, &mut report);
                }
            }
        }

        let elapsed = start.elapsed();
        let final_status = self.finish_drain(&report);
        report.duration = elapsed;
        report.final_status = final_status;

        match final_status {
            SyncStatus::Synced => {
                self.metrics.record_sync_success(elapsed.as_millis() as u64);
                self.cache_stale.store(false, Ordering::SeqCst);
                *self.last_synced_at.write() = Some(Timestamp::now());
            }
            SyncStatus::Failed => self.metrics.record_sync_failure(elapsed.as_millis() as u64),
            _ => self.metrics.record_sync_elapsed(elapsed.as_millis() as u64),
        }

        info!(
            user = %self.config.user_id,
            processed = report.processed,
            succeeded = report.succeeded.len(),
            status = ?final_status,
            "drain complete"
        );
        Ok(report)
    }

    /// Resolves a pending conflict with a caller-supplied value.
    ///
    /// Folds the value into the cache under the conflicted field's key
    /// and re-evaluates the status. Returns false if no unresolved
    /// conflict has that ID.
    ///
    /// # Errors
    ///
    /// Returns an error if folding the value into the cache fails.
    pub fn resolve_conflict(
        &self,
        conflict_id: Uuid,
        value: Value,
        resolved_by: ResolvedBy,
    ) -> EngineResult<bool> {
        let auto = matches!(resolved_by, ResolvedBy::Auto);
        let field_name = {
            let mut conflicts = self.conflicts.write();
            let Some(conflict) = conflicts
                .iter_mut()
                .find(|c| c.id == conflict_id && !c.is_resolved())
            else {
                return Ok(false);
            };
            conflict.resolve(value.clone(), resolved_by);
            conflict.field_name.clone()
        };

        self.fold_value(&field_name, &value)?;
        if auto {
            self.metrics.record_auto_resolution();
        } else {
            self.metrics.record_manual_resolution();
        }
        self.delete_persisted(&conflict_key(conflict_id));

        // From Conflicted, move to Pending once every conflict is
        // resolved; a later evaluation settles Pending into Synced.
        let all_resolved = !self.conflicts.read().iter().any(|c| !c.is_resolved());
        {
            let mut status = self.status.write();
            if *status == SyncStatus::Conflicted && all_resolved {
                *status = SyncStatus::Pending;
            }
        }
        info!(conflict = %conflict_id, field = %field_name, "conflict resolved");
        Ok(true)
    }

    /// Re-evaluates and returns the status from current queue, conflict,
    /// and network state. Does nothing while a drain is in progress.
    pub fn evaluate_status(&self) -> SyncStatus {
        let mut status = self.status.write();
        if *status == SyncStatus::Syncing {
            return SyncStatus::Syncing;
        }
        let next = self.derive_status();
        *status = next;
        next
    }

    /// Moves a permanently-failed operation back into the queue with its
    /// retry count reset. Returns false if the ID is unknown.
    pub fn requeue_failed(&self, operation_id: Uuid) -> bool {
        let operation = {
            let mut failed = self.failed.write();
            let index = failed.iter().position(|op| op.id == operation_id);
            index.map(|i| failed.remove(i))
        };
        let Some(mut operation) = operation else {
            return false;
        };

        operation.retry_count = 0;
        self.delete_persisted(&failed_key(operation.id));
        self.persist_operation(&operation);
        self.queue.lock().push(operation);
        {
            let mut status = self.status.write();
            if !matches!(*status, SyncStatus::Syncing | SyncStatus::Offline) {
                *status = SyncStatus::Pending;
            }
        }
        true
    }

    /// Cancels a queued or permanently-failed operation. Returns false if
    /// the ID is unknown.
    pub fn cancel_operation(&self, operation_id: Uuid) -> bool {
        let removed_from_queue = self.queue.lock().remove(operation_id);
        if let Some(operation) = removed_from_queue {
            self.delete_persisted(&queue_key(operation.id));
            self.evaluate_status();
            return true;
        }
        let removed = {
            let mut failed = self.failed.write();
            let index = failed.iter().position(|op| op.id == operation_id);
            index.map(|i| failed.remove(i))
        };
        match removed {
            Some(operation) => {
                self.delete_persisted(&failed_key(operation.id));
                self.evaluate_status();
                true
            }
            None => false,
        }
    }

    /// Scores sync health on a 0..=100 scale.
    ///
    /// Weighted: 50% success rate, 30% inverse conflict rate, 20% queue
    /// health (empty queue scores full, 10+ queued scores zero).
    #[must_use]
    pub fn health_score(&self) -> u8 {
        let snap = self.metrics.snapshot();
        let total = snap.total_sync_count.max(1) as f64;
        let success_rate = snap.successful_sync_count as f64 / total;
        let conflict_rate = snap.conflict_count as f64 / total;
        let queue_health = (1.0 - self.queue.lock().len() as f64 / 10.0).max(0.0);

        let score =
            (0.5 * success_rate + 0.3 * (1.0 - conflict_rate).max(0.0) + 0.2 * queue_health)
                * 100.0;
        score.round().clamp(0.0, 100.0) as u8
    }

    // === drain internals ===

    fn handle_success(&self, operation: &QueuedOperation, report: &mut DrainReport) {
        if let Ok(bytes) = serde_json::to_vec(&operation.payload) {
            self.metrics.record_bytes_transferred(bytes.len() as u64);
        }
        self.delete_persisted(&queue_key(operation.id));
        if let Some(fields) = operation.payload.fields() {
            for field in fields.keys() {
                self.cache.confirm(&self.field_key(field));
            }
        }
        report.succeeded.push(operation.id);
        debug!(id = %operation.id, "operation acknowledged");
    }

    fn handle_conflict(
        &self,
        operation: &QueuedOperation,
        field_name: String,
        server_value: Value,
        server_timestamp: Timestamp,
        report: &mut DrainReport,
    ) {
        let client_value = operation
            .payload
            .fields()
            .and_then(|fields| fields.get(&field_name))
            .cloned()
            .unwrap_or(Value::Null);

        // Server echoing the queued value is agreement, not a conflict.
        if !values_disagree(&client_value, &server_value) {
            debug!(id = %operation.id, field = %field_name, "server already holds queued value");
            self.handle_success(operation, report);
            return;
        }
        let strategy = *self.strategy.read();

        let mut conflict = SyncConflict::new(
            field_name.clone(),
            client_value,
            server_value,
            operation.enqueued_at,
            server_timestamp,
            strategy,
        );
        self.metrics.record_conflict();
        self.delete_persisted(&queue_key(operation.id));

        match resolve(&conflict, strategy) {
            Some(winner) => {
                conflict.resolve(winner.clone(), ResolvedBy::Auto);
                if let Err(e) = self.fold_value(&field_name, &winner) {
                    warn!(field = %field_name, error = %e, "failed to fold resolved value");
                }
                self.metrics.record_auto_resolution();
                report.conflicts_resolved.push(conflict.id);
                info!(
                    conflict = %conflict.id,
                    field = %field_name,
                    strategy = ?strategy,
                    "conflict auto-resolved"
                );
            }
            None => {
                self.persist_conflict(&conflict);
                report.conflicts_unresolved.push(conflict.id);
                warn!(conflict = %conflict.id, field = %field_name, "conflict awaiting resolution");
            }
        }
        self.conflicts.write().push(conflict);
    }

    fn handle_failure(
        &self,
        mut operation: QueuedOperation,
        message: String,
        retryable: bool,
        report: &mut DrainReport,
    ) {
        if !retryable {
            warn!(id = %operation.id, %message, "operation failed fatally");
            self.mark_permanently_failed(operation, report);
            return;
        }

        if operation.retries_exhausted() {
            warn!(
                id = %operation.id,
                retries = operation.retry_count,
                %message,
                "retries exhausted"
            );
            self.mark_permanently_failed(operation, report);
            return;
        }

        operation.retry_count += 1;
        report.transient_failures.push(TransientFailure {
            operation_id: operation.id,
            message,
            retry_count: operation.retry_count,
        });
        self.persist_operation(&operation);
        self.queue.lock().push_front(operation);
    }

    fn mark_permanently_failed(&self, operation: QueuedOperation, report: &mut DrainReport) {
        self.delete_persisted(&queue_key(operation.id));
        self.persist_failed(&operation);
        report.permanently_failed.push(operation.id);
        self.failed.write().push(operation);
    }

    fn finish_drain(&self, report: &DrainReport) -> SyncStatus {
        let next = if report.stopped == Some(StopReason::WentOffline) {
            SyncStatus::Offline
        } else {
            self.derive_status()
        };
        *self.status.write() = next;
        next
    }

    /// Derives the status from network, conflicts, queue, and failures,
    /// in that precedence order.
    fn derive_status(&self) -> SyncStatus {
        if !self.network.read().online {
            SyncStatus::Offline
        } else if self.conflicts.read().iter().any(|c| !c.is_resolved()) {
            SyncStatus::Conflicted
        } else if !self.queue.lock().is_empty() {
            SyncStatus::Pending
        } else if !self.failed.read().is_empty() {
            SyncStatus::Failed
        } else {
            SyncStatus::Synced
        }
    }

    // === cache plumbing ===

    fn field_key(&self, field: &str) -> String {
        format!("{}/{}", self.config.user_id, field)
    }

    /// Writes optimistic cache entries for each field the operation
    /// touches, so UI layers can render the pending value.
    ///
    /// All-or-nothing: every field is serialized and its key validated
    /// before the first entry is written.
    fn write_optimistic(&self, operation: &QueuedOperation) -> EngineResult<()> {
        let Some(fields) = operation.payload.fields() else {
            return Ok(());
        };
        let mut writes = Vec::with_capacity(fields.len());
        for (field, value) in fields {
            let key = self.field_key(field);
            if field.is_empty() {
                return Err(EngineError::Cache(CacheError::InvalidKey(key)));
            }
            writes.push((key, serde_json::to_vec(value)?));
        }
        for (key, bytes) in writes {
            self.cache.set_with_provenance(
                &key,
                bytes,
                None,
                CachePriority::High,
                Provenance::Optimistic,
            )?;
        }
        Ok(())
    }

    /// Folds a resolved conflict value into the cache as confirmed data.
    fn fold_value(&self, field: &str, value: &Value) -> EngineResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.cache.set_with_provenance(
            &self.field_key(field),
            bytes,
            None,
            CachePriority::High,
            Provenance::Confirmed,
        )?;
        Ok(())
    }

    // === durable persistence ===
    //
    // Store failures are transient: they are logged and the in-memory
    // state stays authoritative.

    fn persist_operation(&self, operation: &QueuedOperation) {
        if !self.config.persist {
            return;
        }
        match serde_json::to_vec(operation) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(&queue_key(operation.id), &bytes) {
                    warn!(id = %operation.id, error = %e, "failed to persist operation");
                }
            }
            Err(e) => warn!(id = %operation.id, error = %e, "failed to encode operation"),
        }
    }

    fn persist_conflict(&self, conflict: &SyncConflict) {
        if !self.config.persist {
            return;
        }
        match serde_json::to_vec(conflict) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(&conflict_key(conflict.id), &bytes) {
                    warn!(id = %conflict.id, error = %e, "failed to persist conflict");
                }
            }
            Err(e) => warn!(id = %conflict.id, error = %e, "failed to encode conflict"),
        }
    }

    fn persist_failed(&self, operation: &QueuedOperation) {
        if !self.config.persist {
            return;
        }
        match serde_json::to_vec(operation) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(&failed_key(operation.id), &bytes) {
                    warn!(id = %operation.id, error = %e, "failed to persist failed operation");
                }
            }
            Err(e) => warn!(id = %operation.id, error = %e, "failed to encode failed operation"),
        }
    }

    fn delete_persisted(&self, key: &str) {
        if !self.config.persist {
            return;
        }
        if let Err(e) = self.store.delete(key) {
            warn!(key, error = %e, "failed to delete persisted state");
        }
    }

    /// Restores queue, conflicts, and failed operations from the store.
    fn load_persisted(&self) {
        let mut operations: Vec<QueuedOperation> =
            self.load_prefix("queue/", |bytes| serde_json::from_slice(bytes).ok());
        // Re-queue in enqueue order so FIFO ties are preserved.
        operations.sort_by_key(|op| op.enqueued_at);
        let restored = operations.len();
        {
            let mut queue = self.queue.lock();
            for operation in operations {
                queue.push(operation);
            }
        }

        let conflicts: Vec<SyncConflict> =
            self.load_prefix("conflict/", |bytes| serde_json::from_slice(bytes).ok());
        let unresolved: Vec<SyncConflict> =
            conflicts.into_iter().filter(|c| !c.is_resolved()).collect();
        let restored_conflicts = unresolved.len();
        self.conflicts.write().extend(unresolved);

        let failed: Vec<QueuedOperation> =
            self.load_prefix("failed/", |bytes| serde_json::from_slice(bytes).ok());
        self.failed.write().extend(failed);

        if restored > 0 || restored_conflicts > 0 {
            info!(
                user = %self.config.user_id,
                operations = restored,
                conflicts = restored_conflicts,
                "restored persisted sync state"
            );
        }
        // The probe has not reported yet; restored work alone decides
        // the initial status.
        let next = if self.conflicts.read().iter().any(|c| !c.is_resolved()) {
            SyncStatus::Conflicted
        } else if !self.queue.lock().is_empty() {
            SyncStatus::Pending
        } else if !self.failed.read().is_empty() {
            SyncStatus::Failed
        } else {
            SyncStatus::Synced
        };
        *self.status.write() = next;
    }

    fn load_prefix<T>(&self, prefix: &str, decode: impl Fn(&[u8]) -> Option<T>) -> Vec<T> {
        let keys = match self.store.list_keys(prefix) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(prefix, error = %e, "failed to list persisted state");
                return Vec::new();
            }
        };
        let mut out = Vec::new();
        for key in keys {
            match self.store.get(&key) {
                Ok(Some(bytes)) => match decode(&bytes) {
                    Some(item) => out.push(item),
                    None => warn!(key, "skipping undecodable persisted record"),
                },
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "failed to read persisted record"),
            }
        }
        out
    }
}

fn queue_key(id: Uuid) -> String {
    format!("queue/{id}")
}

fn conflict_key(id: Uuid) -> String {
    format!("conflict/{id}")
}

fn failed_key(id: Uuid) -> String {
    format!("failed/{id}")
}
