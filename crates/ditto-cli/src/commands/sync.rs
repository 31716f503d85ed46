use std::path::Path;

use ditto_core::config::SyncSettings;
use ditto_core::sync::{HttpRemote, SyncEngine, SyncOutcome};
use ditto_core::TaskStore;

use crate::commands::common::{describe_outcome, load_sync_settings, open_store};
use crate::error::CliError;

pub async fn run_sync(endpoint: Option<String>, db_path: &Path) -> Result<(), CliError> {
    let settings = load_sync_settings(endpoint)?;
    let store = open_store(db_path).await?;

    let outcome = sync_once(store, &settings).await?;
    if let SyncOutcome::Failed { reason } = outcome {
        return Err(CliError::SyncFailed(reason));
    }

    println!("{}", describe_outcome(&outcome));
    Ok(())
}

pub async fn sync_once(store: TaskStore, settings: &SyncSettings) -> Result<SyncOutcome, CliError> {
    let remote = HttpRemote::new(settings)?;
    tracing::debug!(endpoint = remote.endpoint(), "Running one sync cycle");

    let mut engine = SyncEngine::new(store, remote);
    if let Some(policy) = settings.backoff {
        engine = engine.with_backoff(policy);
    }
    Ok(engine.run_cycle().await)
}
