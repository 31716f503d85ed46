//! Outbox synchronization with the remote task endpoint.
//!
//! [`SyncEngine`] drains the outbox as one bulk request and reconciles the
//! local store only after the remote accepted the whole batch.
//! [`ConnectivityScheduler`] runs the engine at startup and whenever
//! connectivity comes back.

mod backoff;
mod engine;
mod remote;
mod scheduler;

pub use backoff::BackoffPolicy;
pub use engine::{SyncEngine, SyncOutcome};
pub use remote::{HttpRemote, RemoteEndpoint, SyncRequest, SyncTodo, TransportError};
pub use scheduler::{ConnectivityScheduler, SyncSubscription};
