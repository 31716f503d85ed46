use std::path::Path;
use std::time::Duration;

use ditto_core::sync::{ConnectivityScheduler, HttpRemote};
use ditto_core::StoreSlot;
use tokio::sync::mpsc;

use crate::commands::common::{describe_outcome, load_sync_settings, open_store};
use crate::error::CliError;
use crate::probe::ReachabilityProbe;

pub async fn run_watch(
    endpoint: Option<String>,
    interval_secs: u64,
    db_path: &Path,
) -> Result<(), CliError> {
    let settings = load_sync_settings(endpoint)?;
    let probe =
        ReachabilityProbe::for_endpoint(&settings.endpoint, Duration::from_secs(interval_secs))?;
    let remote = HttpRemote::new(&settings)?;

    // The scheduler is registered before the store opens; early triggers see NotReady
    let slot = StoreSlot::new();
    let (reports, events) = mpsc::channel(16);
    let mut subscription =
        ConnectivityScheduler::spawn_from_slot(slot.clone(), remote, settings.backoff, events);
    slot.init(open_store(db_path).await?)?;

    let (host, port) = probe.target();
    println!(
        "Watching {} (probing {host}:{port} every {interval_secs}s, Ctrl-C to stop)",
        settings.endpoint
    );
    let probe_task = tokio::spawn(probe.run(reports));

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(CliError::Io),
            outcome = subscription.next_outcome() => {
                let Some(outcome) = outcome else {
                    break Ok(());
                };
                println!("{}", describe_outcome(&outcome));
            }
        }
    };

    probe_task.abort();
    subscription.cancel();
    result
}
