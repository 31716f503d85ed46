use std::path::Path;

use crate::commands::common::{normalize_task_identifier, open_store, resolve_task};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_task_identifier(id)?;
    let store = open_store(db_path).await?;
    let task = resolve_task(&normalized_id, &store).await?;

    store.delete(&task.client_id).await?;
    println!("{}", task.client_id);
    Ok(())
}
