//! Pure reconciliation policy.

use crate::conflict::{ConflictStrategy, SyncConflict};
use serde_json::Value;

/// Returns true if the two values disagree.
///
/// Disagreement is deep structural equality per field; there is no
/// field-level hashing or type coercion.
#[must_use]
pub fn values_disagree(client: &Value, server: &Value) -> bool {
    client != server
}

/// Picks the winning value for a conflict under the given strategy.
///
/// Returns `None` for [`ConflictStrategy::Manual`]: manual conflicts are
/// resolved only by an explicit caller-supplied value.
///
/// # Tie-break
///
/// Under `LastModifiedWins` the value with the strictly later timestamp
/// wins; on an exact tie the server wins (the server is the tie-break
/// authority).
#[must_use]
pub fn resolve(conflict: &SyncConflict, strategy: ConflictStrategy) -> Option<Value> {
    match strategy {
        ConflictStrategy::ClientWins => Some(conflict.client_value.clone()),
        ConflictStrategy::ServerWins => Some(conflict.server_value.clone()),
        ConflictStrategy::LastModifiedWins => {
            if conflict.client_timestamp > conflict.server_timestamp {
                Some(conflict.client_value.clone())
            } else {
                Some(conflict.server_value.clone())
            }
        }
        ConflictStrategy::Merge => Some(shallow_merge(
            &conflict.client_value,
            &conflict.server_value,
        )),
        ConflictStrategy::Manual => None,
    }
}

/// Shallow-merges two values.
///
/// If both are JSON objects, server keys are taken first and client keys
/// overwrite on collision (client precedence). For any other shape the
/// client value wins outright.
fn shallow_merge(client: &Value, server: &Value) -> Value {
    match (client, server) {
        (Value::Object(client_map), Value::Object(server_map)) => {
            let mut merged = server_map.clone();
            for (key, value) in client_map {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => client.clone(),
    }
}
