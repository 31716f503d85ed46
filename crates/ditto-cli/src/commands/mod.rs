pub mod add;
pub mod common;
pub mod config;
pub mod delete;
pub mod list;
pub mod outbox;
pub mod sync;
pub mod toggle;
pub mod watch;
