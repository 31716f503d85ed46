//! Outbox entry model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::TaskId;

/// Kind of mutation queued for the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Column value stored in the `outbox` table
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown outbox operation '{other}'")),
        }
    }
}

/// Snapshot of the task fields an operation carries to the remote.
///
/// Only the fields that were set at enqueue time are serialized, so entries
/// for different operations have different shapes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl TaskPayload {
    /// Full snapshot queued when a task is created
    #[must_use]
    pub fn for_create(task: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            completed: Some(false),
            deleted: Some(false),
        }
    }

    /// Completion change queued by a toggle
    #[must_use]
    pub const fn for_completed(completed: bool) -> Self {
        Self {
            task: None,
            completed: Some(completed),
            deleted: None,
        }
    }

    /// Tombstone queued by a delete
    #[must_use]
    pub const fn for_delete() -> Self {
        Self {
            task: None,
            completed: None,
            deleted: Some(true),
        }
    }
}

/// A pending mutation waiting for remote confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Local sequence number; defines the total order of the queue
    pub id: i64,
    /// Task the mutation applies to
    pub client_id: TaskId,
    /// Mutation kind
    pub operation: Operation,
    /// Field snapshot taken when the entry was queued
    pub payload: TaskPayload,
    /// Enqueue timestamp (Unix ms), sent as the task's `updatedAt`
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operation_column_values() {
        for operation in [Operation::Create, Operation::Update, Operation::Delete] {
            assert_eq!(operation.as_str().parse::<Operation>(), Ok(operation));
        }
        assert!("upsert".parse::<Operation>().is_err());
    }

    #[test]
    fn payload_serializes_only_present_fields() {
        let json = serde_json::to_string(&TaskPayload::for_completed(true)).unwrap();
        assert_eq!(json, r#"{"completed":true}"#);

        let json = serde_json::to_string(&TaskPayload::for_delete()).unwrap();
        assert_eq!(json, r#"{"deleted":true}"#);
    }

    #[test]
    fn create_payload_is_full_snapshot() {
        let json = serde_json::to_value(TaskPayload::for_create("buy milk")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"task": "buy milk", "completed": false, "deleted": false})
        );
    }

    #[test]
    fn payload_parses_sparse_json() {
        let payload: TaskPayload = serde_json::from_str(r#"{"completed":false}"#).unwrap();
        assert_eq!(payload, TaskPayload::for_completed(false));
    }
}
