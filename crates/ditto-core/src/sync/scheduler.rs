//! Runs sync cycles at startup and whenever connectivity is regained.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use super::backoff::BackoffPolicy;
use super::engine::{SyncEngine, SyncOutcome};
use super::remote::RemoteEndpoint;
use crate::services::StoreSlot;

/// Background driver for a [`SyncEngine`].
///
/// Consumes connectivity reports (`true` = online) and triggers a cycle on
/// every offline to online transition. Reports that repeat the previous state
/// do nothing. One cycle always runs at startup; if the store was not ready
/// for it, the next online report runs it instead.
pub struct ConnectivityScheduler;

impl ConnectivityScheduler {
    /// Start driving an engine that is already built.
    pub fn spawn<R>(engine: Arc<SyncEngine<R>>, events: mpsc::Receiver<bool>) -> SyncSubscription
    where
        R: RemoteEndpoint + 'static,
    {
        Self::start(EngineSource::Ready(engine), events)
    }

    /// Start driving an engine built from `slot` once the store is installed.
    ///
    /// Triggers that arrive before [`StoreSlot::init`] report [`SyncOutcome::NotReady`].
    pub fn spawn_from_slot<R>(
        slot: StoreSlot,
        remote: R,
        backoff: Option<BackoffPolicy>,
        events: mpsc::Receiver<bool>,
    ) -> SyncSubscription
    where
        R: RemoteEndpoint + 'static,
    {
        Self::start(
            EngineSource::Pending {
                slot,
                remote: Some(remote),
                backoff,
            },
            events,
        )
    }

    fn start<R>(source: EngineSource<R>, events: mpsc::Receiver<bool>) -> SyncSubscription
    where
        R: RemoteEndpoint + 'static,
    {
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_loop(source, events, outcome_tx));
        SyncSubscription { handle, outcomes }
    }
}

enum EngineSource<R> {
    Ready(Arc<SyncEngine<R>>),
    Pending {
        slot: StoreSlot,
        remote: Option<R>,
        backoff: Option<BackoffPolicy>,
    },
}

impl<R: RemoteEndpoint> EngineSource<R> {
    fn engine(&mut self) -> Option<Arc<SyncEngine<R>>> {
        match self {
            Self::Ready(engine) => Some(Arc::clone(engine)),
            Self::Pending {
                slot,
                remote,
                backoff,
            } => {
                let store = match slot.get() {
                    Ok(store) => store,
                    Err(error) => {
                        tracing::debug!("Skipping sync trigger: {error}");
                        return None;
                    }
                };
                let remote = remote.take()?;
                let mut engine = SyncEngine::new(store, remote);
                if let Some(policy) = backoff {
                    engine = engine.with_backoff(*policy);
                }
                let engine = Arc::new(engine);
                *self = Self::Ready(Arc::clone(&engine));
                Some(engine)
            }
        }
    }
}

async fn run_loop<R>(
    mut source: EngineSource<R>,
    mut events: mpsc::Receiver<bool>,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
) where
    R: RemoteEndpoint + 'static,
{
    let mut cycles = JoinSet::new();
    let mut online: Option<bool> = None;

    tracing::debug!("Sync scheduler started");
    let mut missed = !trigger(&mut source, &mut cycles, &outcomes);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(now_online) = event else {
                    break;
                };
                let regained = online == Some(false) && now_online;
                online = Some(now_online);
                if regained || (missed && now_online) {
                    tracing::info!("Connectivity regained; triggering sync");
                    missed = !trigger(&mut source, &mut cycles, &outcomes);
                } else if !now_online {
                    tracing::debug!("Connectivity lost");
                }
            }
            Some(_) = cycles.join_next(), if !cycles.is_empty() => {}
        }
    }

    // Let in-flight cycles report before the outcome channel closes
    while cycles.join_next().await.is_some() {}
    tracing::debug!("Sync scheduler stopped");
}

/// Start a cycle; returns `false` when the store is not ready yet.
fn trigger<R>(
    source: &mut EngineSource<R>,
    cycles: &mut JoinSet<()>,
    outcomes: &mpsc::UnboundedSender<SyncOutcome>,
) -> bool
where
    R: RemoteEndpoint + 'static,
{
    let Some(engine) = source.engine() else {
        outcomes.send(SyncOutcome::NotReady).ok();
        return false;
    };
    let outcomes = outcomes.clone();
    // Concurrent cycles resolve to AlreadyRunning inside the engine
    cycles.spawn(async move {
        let outcome = engine.run_cycle().await;
        outcomes.send(outcome).ok();
    });
    true
}

/// Handle to a running [`ConnectivityScheduler`].
///
/// Dropping the handle stops the scheduler.
pub struct SyncSubscription {
    handle: JoinHandle<()>,
    outcomes: mpsc::UnboundedReceiver<SyncOutcome>,
}

impl SyncSubscription {
    /// Next cycle result; `None` once the scheduler has stopped.
    pub async fn next_outcome(&mut self) -> Option<SyncOutcome> {
        self.outcomes.recv().await
    }

    /// Stop the scheduler, aborting any cycle in flight.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SyncSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::TaskStore;
    use crate::sync::engine::tests::FakeRemote;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    async fn engine_with(remote: FakeRemote) -> Arc<SyncEngine<FakeRemote>> {
        Arc::new(SyncEngine::new(
            TaskStore::open_in_memory().await.unwrap(),
            remote,
        ))
    }

    async fn drain(mut subscription: SyncSubscription) -> Vec<SyncOutcome> {
        let mut seen = Vec::new();
        while let Some(outcome) = subscription.next_outcome().await {
            seen.push(outcome);
        }
        seen
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_once_at_startup() {
        let remote = FakeRemote::accepting();
        let engine = engine_with(remote.clone()).await;
        engine.store().create("queued offline").await.unwrap();
        let (events, rx) = mpsc::channel(8);

        let mut subscription = ConnectivityScheduler::spawn(Arc::clone(&engine), rx);

        assert_eq!(
            subscription.next_outcome().await,
            Some(SyncOutcome::Synced {
                sent: 1,
                carried_over: false
            })
        );
        drop(events);
        assert_eq!(drain(subscription).await, Vec::new());
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn steady_online_reports_do_not_trigger() {
        let remote = FakeRemote::accepting();
        let engine = engine_with(remote.clone()).await;
        let (events, rx) = mpsc::channel(8);
        let subscription = ConnectivityScheduler::spawn(Arc::clone(&engine), rx);

        for _ in 0..3 {
            events.send(true).await.unwrap();
        }
        drop(events);

        assert_eq!(drain(subscription).await, vec![SyncOutcome::Empty]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_to_online_triggers_one_cycle() {
        let remote = FakeRemote::accepting();
        let engine = engine_with(remote.clone()).await;
        let (events, rx) = mpsc::channel(8);
        let mut subscription = ConnectivityScheduler::spawn(Arc::clone(&engine), rx);
        assert_eq!(subscription.next_outcome().await, Some(SyncOutcome::Empty));

        events.send(false).await.unwrap();
        engine.store().create("while offline").await.unwrap();
        events.send(false).await.unwrap();
        events.send(true).await.unwrap();
        events.send(true).await.unwrap();
        drop(events);

        assert_eq!(
            drain(subscription).await,
            vec![SyncOutcome::Synced {
                sent: 1,
                carried_over: false
            }]
        );
        assert_eq!(remote.calls(), 1);
        assert_eq!(engine.store().pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edge_during_flight_is_dropped() {
        let (remote, gate) = FakeRemote::gated();
        let engine = engine_with(remote.clone()).await;
        engine.store().create("slow").await.unwrap();
        let mut phases = engine.subscribe();
        let (events, rx) = mpsc::channel(8);
        let mut subscription = ConnectivityScheduler::spawn(Arc::clone(&engine), rx);

        phases
            .wait_for(|phase| phase.is_busy())
            .await
            .unwrap();
        events.send(false).await.unwrap();
        events.send(true).await.unwrap();

        assert_eq!(
            subscription.next_outcome().await,
            Some(SyncOutcome::AlreadyRunning)
        );
        gate.notify_one();
        assert!(subscription.next_outcome().await.unwrap().is_synced());
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slot_triggers_before_init_report_not_ready() {
        let slot = StoreSlot::new();
        let remote = FakeRemote::accepting();
        let (events, rx) = mpsc::channel(8);
        let mut subscription =
            ConnectivityScheduler::spawn_from_slot(slot.clone(), remote.clone(), None, rx);

        assert_eq!(subscription.next_outcome().await, Some(SyncOutcome::NotReady));

        let store = TaskStore::open_in_memory().await.unwrap();
        store.create("after startup").await.unwrap();
        slot.init(store.clone()).unwrap();
        events.send(false).await.unwrap();
        events.send(true).await.unwrap();

        assert!(subscription.next_outcome().await.unwrap().is_synced());
        assert_eq!(store.pending_count().await.unwrap(), 0);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn skipped_startup_runs_on_next_online_report() {
        let slot = StoreSlot::new();
        let remote = FakeRemote::accepting();
        let (events, rx) = mpsc::channel(8);
        let mut subscription =
            ConnectivityScheduler::spawn_from_slot(slot.clone(), remote.clone(), None, rx);
        assert_eq!(subscription.next_outcome().await, Some(SyncOutcome::NotReady));

        events.send(true).await.unwrap();
        let store = TaskStore::open_in_memory().await.unwrap();
        store.create("queued before ready").await.unwrap();
        slot.init(store.clone()).unwrap();
        events.send(true).await.unwrap();
        events.send(true).await.unwrap();
        drop(events);

        let outcomes = drain(subscription).await;
        assert!(outcomes[..outcomes.len() - 1]
            .iter()
            .all(|outcome| *outcome == SyncOutcome::NotReady));
        assert_eq!(
            outcomes.last(),
            Some(&SyncOutcome::Synced {
                sent: 1,
                carried_over: false
            })
        );
        assert_eq!(remote.calls(), 1);
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_stops_the_scheduler() {
        let (remote, _gate) = FakeRemote::gated();
        let engine = engine_with(remote).await;
        engine.store().create("never sent").await.unwrap();
        let (_events, rx) = mpsc::channel(8);
        let subscription = ConnectivityScheduler::spawn(Arc::clone(&engine), rx);

        subscription.cancel();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !subscription.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(engine.store().pending_count().await.unwrap(), 1);
    }
}
