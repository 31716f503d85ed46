//! Database layer for ditto

mod connection;
mod migrations;
mod outbox_repository;
mod task_repository;

pub use connection::Database;
pub use outbox_repository::{LibSqlOutboxRepository, OutboxRepository};
pub use task_repository::{LibSqlTaskRepository, TaskRepository};
