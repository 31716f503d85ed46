//! Data models for ditto

mod outbox;
mod task;

pub use outbox::{Operation, OutboxEntry, TaskPayload};
pub use task::{SyncStatus, Task, TaskId, TaskView};
