//! Sync engine state machine.

use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use super::backoff::{BackoffPolicy, BackoffState};
use super::remote::{RemoteEndpoint, SyncRequest};
use crate::services::TaskStore;
use crate::state::SyncPhase;

/// Result of one sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was queued
    Empty,
    /// The remote accepted `sent` entries and the store was reconciled
    Synced { sent: usize, carried_over: bool },
    /// The batch was not accepted; local state is unchanged
    Failed { reason: String },
    /// Another cycle was in flight, so this trigger was dropped
    AlreadyRunning,
    /// A previous failure's retry window is still open
    BackingOff { retry_in: Duration },
    /// The task store has not been opened yet
    NotReady,
}

impl SyncOutcome {
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

/// Drains the outbox against a [`RemoteEndpoint`], one cycle at a time.
pub struct SyncEngine<R> {
    store: TaskStore,
    remote: R,
    backoff_policy: Option<BackoffPolicy>,
    // Held for the whole cycle; try_lock failing means a cycle is in flight
    cycle: Mutex<BackoffState>,
    phase: watch::Sender<SyncPhase>,
}

impl<R: RemoteEndpoint> SyncEngine<R> {
    pub fn new(store: TaskStore, remote: R) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            remote,
            backoff_policy: None,
            cycle: Mutex::new(BackoffState::default()),
            phase,
        }
    }

    /// Defer triggers after failures according to `policy`
    #[must_use]
    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff_policy = Some(policy);
        self
    }

    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Current phase of the state machine.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Run one sync cycle unless one is already in flight.
    ///
    /// Never returns an error: every failure leaves the outbox for the next trigger.
    pub async fn run_cycle(&self) -> SyncOutcome {
        let Ok(mut backoff) = self.cycle.try_lock() else {
            tracing::debug!("Sync cycle already in flight; ignoring trigger");
            return SyncOutcome::AlreadyRunning;
        };

        if let Some(retry_in) = backoff.remaining(Instant::now()) {
            tracing::debug!(
                retry_in_ms = retry_in.as_millis(),
                "Sync backing off after failure"
            );
            return SyncOutcome::BackingOff { retry_in };
        }

        let outcome = self.drive(&mut backoff).await;
        self.set_phase(SyncPhase::Idle);
        outcome
    }

    async fn drive(&self, backoff: &mut BackoffState) -> SyncOutcome {
        self.set_phase(SyncPhase::Draining);
        let batch = match self.store.pending_entries().await {
            Ok(batch) => batch,
            Err(error) => {
                tracing::warn!("Failed to read outbox: {error}");
                return SyncOutcome::Failed {
                    reason: error.to_string(),
                };
            }
        };

        let Some(last_id) = batch.iter().map(|entry| entry.id).max() else {
            tracing::debug!("Outbox empty; nothing to sync");
            return SyncOutcome::Empty;
        };

        let request = SyncRequest::from_entries(&batch);
        self.set_phase(SyncPhase::AwaitingRemote);
        tracing::debug!(entries = request.len(), last_id, "Sending sync batch");

        if let Err(error) = self.remote.push(&request).await {
            let delay = backoff.record_failure(self.backoff_policy.as_ref(), Instant::now());
            tracing::warn!(
                pending = request.len(),
                failures = backoff.failures(),
                timeout = error.is_timeout(),
                retry_in_ms = delay.as_millis(),
                "Sync failed, will retry on next trigger: {error}"
            );
            return SyncOutcome::Failed {
                reason: error.to_string(),
            };
        }

        self.set_phase(SyncPhase::Reconciling);
        match self.store.reconcile(last_id).await {
            Ok(summary) => {
                backoff.record_success();
                tracing::info!(
                    sent = request.len(),
                    cleared = summary.cleared,
                    marked_synced = summary.marked_synced,
                    carried_over = summary.carried_over,
                    "Sync successful"
                );
                SyncOutcome::Synced {
                    sent: request.len(),
                    carried_over: summary.carried_over,
                }
            }
            Err(error) => {
                // Batch stays queued and will be re-sent; the remote sees it twice
                tracing::warn!("Remote accepted batch but local reconcile failed: {error}");
                SyncOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    fn set_phase(&self, phase: SyncPhase) {
        tracing::trace!(phase = phase.label(), "Sync phase");
        self.phase.send_replace(phase);
    }
}
