//! # ProfSync Protocol
//!
//! Shared data model and reconciliation policy for ProfSync.
//!
//! This crate provides:
//! - `QueuedOperation` and its typed payload union
//! - `SyncConflict` for conflict tracking
//! - `ConflictStrategy` and the pure `resolve` reconciliation function
//! - `NetworkState` as reported by the platform's network probe
//! - `SendOutcome`, the remote endpoint's per-operation reply
//!
//! This is a pure data-model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod network;
mod operation;
mod outcome;
mod resolve;
mod timestamp;

pub use conflict::{ConflictResolution, ConflictStrategy, ResolvedBy, SyncConflict};
pub use network::{ConnectionType, NetworkState, QualityTier};
pub use operation::{ExportFormat, OperationKind, OperationPayload, QueuedOperation};
pub use outcome::SendOutcome;
pub use resolve::{resolve, values_disagree};
pub use timestamp::Timestamp;
