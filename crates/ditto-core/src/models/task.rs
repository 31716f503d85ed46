//! Task model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a task, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Whether the remote endpoint has confirmed a task's local state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local state not yet accepted by the remote
    #[default]
    Pending,
    /// Remote accepted every queued change for this task
    Synced,
}

impl SyncStatus {
    /// Column value stored in the `tasks` table
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

/// A task in the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier assigned at creation
    pub client_id: TaskId,
    /// Task text
    pub task: String,
    /// Completion flag
    pub completed: bool,
    /// Tombstone column; deletes are hard deletes so live rows keep `false`
    pub deleted: bool,
    /// Last local mutation (Unix ms)
    pub updated_at: i64,
    /// Remote confirmation state
    pub sync_status: SyncStatus,
}

impl Task {
    /// Create a new pending task stamped with `now`
    #[must_use]
    pub fn new(task: impl Into<String>, now: i64) -> Self {
        Self {
            client_id: TaskId::new(),
            task: task.into(),
            completed: false,
            deleted: false,
            updated_at: now,
            sync_status: SyncStatus::Pending,
        }
    }

    /// Whether the remote has accepted this task's latest state
    pub const fn is_synced(&self) -> bool {
        matches!(self.sync_status, SyncStatus::Synced)
    }

    /// Projection handed to the UI
    #[must_use]
    pub fn view(&self) -> TaskView {
        TaskView::from(self)
    }
}

/// UI-facing projection of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: String,
    pub task: String,
    pub completed: bool,
    pub synced: bool,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.client_id.to_string(),
            task: task.task.clone(),
            completed: task.completed,
            synced: task.is_synced(),
        }
    }
}
