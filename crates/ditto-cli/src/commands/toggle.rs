use std::path::Path;

use crate::commands::common::{normalize_task_identifier, open_store, resolve_task};
use crate::error::CliError;

pub async fn run_toggle(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_task_identifier(id)?;
    let store = open_store(db_path).await?;
    let task = resolve_task(&normalized_id, &store).await?;

    let toggled = store.toggle(&task.client_id).await?;
    let state = if toggled.completed { "done" } else { "open" };
    println!("{} {state}", toggled.client_id);
    Ok(())
}
