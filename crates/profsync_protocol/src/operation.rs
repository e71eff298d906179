//! Queued profile operations.

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Export format for profile data exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Machine-readable JSON export.
    Json,
    /// Printable PDF export.
    Pdf,
}

/// The kind of a queued operation, used for keying and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Update top-level profile fields.
    UpdateProfile,
    /// Upload a new avatar image.
    UploadAvatar,
    /// Remove the current avatar.
    DeleteAvatar,
    /// Update user-defined custom fields.
    UpdateCustomFields,
    /// Update privacy settings.
    UpdatePrivacySettings,
    /// Share the profile with another party.
    ShareProfile,
    /// Export the full profile.
    ExportProfile,
}

/// The typed payload of a queued operation.
///
/// Each operation kind carries its own strongly-typed payload rather than
/// an untyped map, so payload shape mismatches are unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperationPayload {
    /// Update top-level profile fields (field name to new value).
    UpdateProfile {
        /// Field name to new value.
        fields: BTreeMap<String, Value>,
    },
    /// Upload a new avatar. The image bytes live in the durable store
    /// under `blob_key`; only metadata travels with the operation.
    UploadAvatar {
        /// MIME type of the image.
        content_type: String,
        /// Size of the image in bytes.
        bytes_len: u64,
        /// Durable-store key holding the image bytes.
        blob_key: String,
    },
    /// Remove the current avatar.
    DeleteAvatar,
    /// Update user-defined custom fields.
    UpdateCustomFields {
        /// Field name to new value.
        fields: BTreeMap<String, Value>,
    },
    /// Update privacy settings.
    UpdatePrivacySettings {
        /// Setting name to new value.
        settings: BTreeMap<String, Value>,
    },
    /// Share the profile with another party.
    ShareProfile {
        /// Recipient identifier (user id, email, or link channel).
        target: String,
    },
    /// Export the full profile.
    ExportProfile {
        /// Requested export format.
        format: ExportFormat,
    },
}

impl OperationPayload {
    /// Returns the kind of this payload.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationPayload::UpdateProfile { .. } => OperationKind::UpdateProfile,
            OperationPayload::UploadAvatar { .. } => OperationKind::UploadAvatar,
            OperationPayload::DeleteAvatar => OperationKind::DeleteAvatar,
            OperationPayload::UpdateCustomFields { .. } => OperationKind::UpdateCustomFields,
            OperationPayload::UpdatePrivacySettings { .. } => OperationKind::UpdatePrivacySettings,
            OperationPayload::ShareProfile { .. } => OperationKind::ShareProfile,
            OperationPayload::ExportProfile { .. } => OperationKind::ExportProfile,
        }
    }

    /// Returns the profile fields this payload writes, if any.
    ///
    /// Used by the engine to seed optimistic cache entries and to match
    /// server conflict reports against locally queued values.
    #[must_use]
    pub fn fields(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            OperationPayload::UpdateProfile { fields }
            | OperationPayload::UpdateCustomFields { fields } => Some(fields),
            OperationPayload::UpdatePrivacySettings { settings } => Some(settings),
            _ => None,
        }
    }
}

/// Highest priority a queued operation can carry.
pub const MAX_PRIORITY: u8 = 10;
/// Lowest priority a queued operation can carry.
pub const MIN_PRIORITY: u8 = 1;

/// A profile mutation waiting to be delivered to the remote endpoint.
///
/// # Invariants
///
/// - `retry_count <= max_retries`; once the bound is exceeded the
///   operation leaves the active queue permanently
/// - `priority` is always within `1..=10` (10 is highest)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Unique operation ID.
    pub id: Uuid,
    /// The typed payload.
    pub payload: OperationPayload,
    /// When the operation was queued.
    pub enqueued_at: Timestamp,
    /// Transient failures seen so far.
    pub retry_count: u32,
    /// Maximum transient failures before the operation is permanently failed.
    pub max_retries: u32,
    /// Priority within `1..=10`, 10 highest.
    pub priority: u8,
    /// Whether a user action triggered this operation directly.
    pub user_initiated: bool,
    /// Rough delivery cost estimate, for scheduling display.
    pub estimated_duration_ms: u64,
}

impl QueuedOperation {
    /// Creates a new queued operation with a fresh ID.
    ///
    /// Returns `None` if `priority` is out of the `1..=10` range; callers
    /// treat that as a contract violation, not something to clamp.
    #[must_use]
    pub fn new(payload: OperationPayload, priority: u8, user_initiated: bool) -> Option<Self> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return None;
        }
        let estimated_duration_ms = estimate_duration_ms(&payload);
        Some(Self {
            id: Uuid::new_v4(),
            payload,
            enqueued_at: Timestamp::now(),
            retry_count: 0,
            max_retries: 3,
            priority,
            user_initiated,
            estimated_duration_ms,
        })
    }

    /// Sets the retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the kind of this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.payload.kind()
    }

    /// Returns true if another transient failure would exceed the bound.
    #[must_use]
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Rough per-kind delivery cost used for `estimated_duration_ms`.
fn estimate_duration_ms(payload: &OperationPayload) -> u64 {
    match payload {
        OperationPayload::UploadAvatar { bytes_len, .. } => 2_000 + bytes_len / 1_024,
        OperationPayload::ExportProfile { .. } => 5_000,
        OperationPayload::DeleteAvatar | OperationPayload::ShareProfile { .. } => 500,
        _ => 1_000,
    }
}
