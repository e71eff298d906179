//! Remote endpoint abstraction.

use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use profsync_protocol::{QueuedOperation, SendOutcome};
use std::collections::VecDeque;

/// The remote service receiving queued operations.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, gRPC, mock for testing, etc.). Implementations
/// own the per-operation timeout: a delivery that exceeds
/// [`crate::EngineConfig::op_timeout`] should return
/// [`EngineError::Timeout`], which the engine treats as a transient
/// failure.
pub trait RemoteEndpoint: Send + Sync {
    /// Delivers one operation and returns the server's reply.
    ///
    /// # Errors
    ///
    /// Returns an error when the delivery itself fails (connection lost,
    /// timeout); the engine maps retryable errors to retry bookkeeping.
    fn send(&self, operation: &QueuedOperation) -> EngineResult<SendOutcome>;
}

/// A scripted endpoint for testing.
///
/// Replies are consumed from a queue in order; once the script is
/// exhausted, every delivery succeeds with an empty acknowledgment.
#[derive(Debug, Default)]
pub struct MockEndpoint {
    script: Mutex<VecDeque<EngineResult<SendOutcome>>>,
    sent: Mutex<Vec<QueuedOperation>>,
}

impl MockEndpoint {
    /// Creates a mock that acknowledges everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scripted reply.
    pub fn push_outcome(&self, outcome: SendOutcome) {
        self.script.lock().push_back(Ok(outcome));
    }

    /// Appends a scripted transport-level error.
    pub fn push_error(&self, error: EngineError) {
        self.script.lock().push_back(Err(error));
    }

    /// Returns every operation delivered so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<QueuedOperation> {
        self.sent.lock().clone()
    }

    /// Returns the number of deliveries so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl RemoteEndpoint for MockEndpoint {
    fn send(&self, operation: &QueuedOperation) -> EngineResult<SendOutcome> {
        self.sent.lock().push(operation.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SendOutcome::ok()))
    }
}
