//! ditto-core - Core library for ditto
//!
//! This crate contains the task models, the local database layer (task table
//! and outbox), the mutation service used by every front-end and the sync
//! engine that drains the outbox against the remote endpoint.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod sync;

pub use error::{Error, Result};
pub use models::{Operation, OutboxEntry, SyncStatus, Task, TaskId, TaskPayload, TaskView};
pub use services::{StoreSlot, TaskStore};
