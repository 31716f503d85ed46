use std::path::Path;

use chrono::Utc;

use crate::commands::common::{format_task_lines, open_store, task_to_list_item, TaskListItem};
use crate::error::CliError;

pub async fn run_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let tasks = store.list_tasks().await?;

    if as_json {
        let json_items = tasks
            .iter()
            .map(task_to_list_item)
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if tasks.is_empty() {
        println!("No tasks yet.");
    } else {
        for line in format_task_lines(&tasks, Utc::now().timestamp_millis()) {
            println!("{line}");
        }
    }

    Ok(())
}
