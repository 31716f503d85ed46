use std::path::Path;

use crate::commands::common::{open_store, resolve_task_text};
use crate::error::CliError;

pub async fn run_add(text_parts: &[String], db_path: &Path) -> Result<(), CliError> {
    let text = resolve_task_text(text_parts)?;

    let store = open_store(db_path).await?;
    let task = store.create(&text).await?;

    println!("{}", task.client_id);
    Ok(())
}
