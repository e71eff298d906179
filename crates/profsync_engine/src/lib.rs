//! # ProfSync Engine
//!
//! Offline sync state machine and mutation queue for ProfSync.
//!
//! This crate provides:
//! - Sync status state machine (synced → pending → syncing → ...)
//! - Priority queue of profile mutations with FIFO tie-break
//! - Conflict ledger with strategy-driven auto-resolution
//! - Retry bookkeeping with a hard per-operation bound
//! - Health scoring and sync metrics
//! - Durable persistence of pending work across restarts
//! - Remote endpoint abstraction with a scripted mock
//!
//! ## Architecture
//!
//! The engine owns one user's offline state. Mutations are queued while
//! offline or on transient failure; when connectivity resumes, `drain`
//! delivers them in priority order. A server disagreement becomes a
//! first-class conflict, auto-resolved by the active strategy unless the
//! strategy is manual.
//!
//! ## Key Invariants
//!
//! - The queue is always ordered by priority (descending), FIFO on ties
//! - `retry_count` never exceeds `max_retries`; exhausted operations move
//!   to the permanently-failed list exactly once
//! - A conflict is either fully resolved or fully unresolved
//! - An offline flip mid-drain stops new deliveries and leaves the
//!   remaining queue untouched

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod endpoint;
mod engine;
mod error;
mod metrics;
mod queue;

pub use config::EngineConfig;
pub use endpoint::{MockEndpoint, RemoteEndpoint};
pub use engine::{CancelHandle, DrainReport, StopReason, SyncEngine, SyncStatus, TransientFailure};
pub use error::{EngineError, EngineResult};
pub use metrics::{MetricsSnapshot, SyncMetrics};
pub use queue::OperationQueue;
