//! Conflict tracking between local and remote field values.

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Who resolved a conflict.
///
/// Serialized as a bare string: `"auto"`, `"manual"`, or the user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBy {
    /// Resolved automatically by the active strategy.
    Auto,
    /// Resolved manually without a specific user attribution.
    Manual,
    /// Resolved by a specific user.
    User(String),
}

impl ResolvedBy {
    /// Returns the string form used on the wire and in the store.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ResolvedBy::Auto => "auto",
            ResolvedBy::Manual => "manual",
            ResolvedBy::User(id) => id,
        }
    }
}

impl From<&str> for ResolvedBy {
    fn from(s: &str) -> Self {
        match s {
            "auto" => ResolvedBy::Auto,
            "manual" => ResolvedBy::Manual,
            other => ResolvedBy::User(other.to_string()),
        }
    }
}

impl Serialize for ResolvedBy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResolvedBy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ResolvedBy::from(s.as_str()))
    }
}

/// The resolution of a conflict.
///
/// Grouping value, attribution, and time into one struct makes the
/// resolved/unresolved duality structural: a conflict either has all
/// three or none of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    /// The winning value folded back into the cache.
    pub value: Value,
    /// Who resolved the conflict.
    pub resolved_by: ResolvedBy,
    /// When the conflict was resolved.
    pub resolved_at: Timestamp,
}

/// A detected disagreement between a locally queued value and the
/// server's value for the same field.
///
/// Conflicts are not errors. Both values are retained until resolution;
/// resolving never discards data silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Unique conflict ID.
    pub id: Uuid,
    /// The conflicted field.
    pub field_name: String,
    /// The locally queued value.
    pub client_value: Value,
    /// The server's value.
    pub server_value: Value,
    /// When the client last modified the field.
    pub client_timestamp: Timestamp,
    /// When the server last modified the field.
    pub server_timestamp: Timestamp,
    /// The strategy active when the conflict was detected.
    pub strategy: ConflictStrategy,
    /// Resolution, once one exists.
    pub resolution: Option<ConflictResolution>,
}

impl SyncConflict {
    /// Creates a new unresolved conflict.
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        client_value: Value,
        server_value: Value,
        client_timestamp: Timestamp,
        server_timestamp: Timestamp,
        strategy: ConflictStrategy,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            field_name: field_name.into(),
            client_value,
            server_value,
            client_timestamp,
            server_timestamp,
            strategy,
            resolution: None,
        }
    }

    /// Returns true if the conflict has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Marks the conflict resolved with the given value and attribution.
    pub fn resolve(&mut self, value: Value, resolved_by: ResolvedBy) {
        self.resolution = Some(ConflictResolution {
            value,
            resolved_by,
            resolved_at: Timestamp::now(),
        });
    }
}

/// Policy for picking a winning value when a conflict is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// The locally queued value always wins.
    ClientWins,
    /// The server's value always wins.
    ServerWins,
    /// The value with the strictly later timestamp wins; the server wins
    /// an exact tie.
    LastModifiedWins,
    /// Shallow-merge structured values, client keys winning collisions.
    Merge,
    /// Conflicts are left pending for explicit resolution.
    Manual,
}

impl ConflictStrategy {
    /// Returns true if this strategy resolves conflicts without caller
    /// involvement.
    #[must_use]
    pub fn auto_resolves(&self) -> bool {
        !matches!(self, ConflictStrategy::Manual)
    }
}
