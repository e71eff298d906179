//! # ProfSync Store
//!
//! Durable key-value store contract and backends for ProfSync.
//!
//! This crate provides the lowest-level persistence seam for the offline
//! engine. Stores are **opaque byte stores** keyed by string - they do not
//! interpret the data they hold.
//!
//! ## Design Principles
//!
//! - Stores are simple keyed byte stores (get, set, delete, list)
//! - No knowledge of queued operations, conflicts, or cache entries
//! - Must be `Send + Sync` for concurrent access
//! - The engine owns all payload interpretation
//! - Store failures are transient from the caller's point of view; callers
//!   must never let a failed store call corrupt their in-memory state
//!
//! ## Available Backends
//!
//! - [`MemoryStore`] - For testing and ephemeral state
//! - [`FileStore`] - For persistent state using one file per key
//!
//! ## Example
//!
//! ```rust
//! use profsync_store::{DurableStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("queue/op-1", b"payload").unwrap();
//! let data = store.get("queue/op-1").unwrap();
//! assert_eq!(data.as_deref(), Some(&b"payload"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::DurableStore;
