//! Per-operation replies from the remote endpoint.

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The remote endpoint's reply to a single delivered operation.
///
/// A `Conflict` is reported when the server holds a value for a field the
/// operation touched that disagrees with the locally queued value.
/// Disagreement is deep value equality per field: two values conflict iff
/// they are not structurally equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SendOutcome {
    /// The operation was accepted.
    Ok {
        /// Optional acknowledgment payload (e.g. the stored value).
        payload: Option<Value>,
    },
    /// The server holds a divergent value for a field the operation touched.
    Conflict {
        /// The conflicted field.
        field_name: String,
        /// The server's value for the field.
        server_value: Value,
        /// When the server last modified the field.
        server_timestamp: Timestamp,
    },
    /// The operation failed.
    Error {
        /// Human-readable error description.
        message: String,
        /// Whether retrying could succeed.
        retryable: bool,
    },
}

impl SendOutcome {
    /// An acceptance with no payload.
    #[must_use]
    pub fn ok() -> Self {
        SendOutcome::Ok { payload: None }
    }

    /// A retryable failure.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        SendOutcome::Error {
            message: message.into(),
            retryable: true,
        }
    }

    /// A non-retryable failure.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        SendOutcome::Error {
            message: message.into(),
            retryable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors() {
        assert_eq!(SendOutcome::ok(), SendOutcome::Ok { payload: None });
        assert!(matches!(
            SendOutcome::transient("timeout"),
            SendOutcome::Error { retryable: true, .. }
        ));
        assert!(matches!(
            SendOutcome::fatal("rejected"),
            SendOutcome::Error { retryable: false, .. }
        ));
    }

    #[test]
    fn tagged_serialization() {
        let outcome = SendOutcome::Conflict {
            field_name: "bio".into(),
            server_value: json!("B"),
            server_timestamp: Timestamp::from_millis(99),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"conflict\""));
        let back: SendOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
