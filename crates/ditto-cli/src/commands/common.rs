use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use ditto_core::config::{non_blank, SyncSettings, ENV_SYNC_URL};
use ditto_core::sync::SyncOutcome;
use ditto_core::{OutboxEntry, Task, TaskId, TaskPayload, TaskStore};
use serde::Serialize;

use crate::cli_config::CliConfig;
use crate::error::CliError;

const SHORT_ID_LEN: usize = 13;

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: String,
    pub task: String,
    pub completed: bool,
    pub synced: bool,
    pub updated_at: i64,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct OutboxItem {
    pub id: i64,
    pub client_id: String,
    pub operation: String,
    pub payload: TaskPayload,
    pub created_at: i64,
    pub created_at_iso: String,
}

pub async fn open_store(path: &Path) -> Result<TaskStore, CliError> {
    Ok(TaskStore::open_path(path).await?)
}

pub async fn resolve_task(task_query: &str, store: &TaskStore) -> Result<Task, CliError> {
    if let Ok(task_id) = task_query.parse::<TaskId>() {
        if let Some(task) = store.get(&task_id).await? {
            return Ok(task);
        }
    }

    let matching_ids = store.list_ids_by_prefix(task_query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::TaskNotFound(task_query.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<TaskId>()
                .map_err(|_| CliError::TaskNotFound(task_query.to_string()))?;
            store
                .get(&resolved_id)
                .await?
                .ok_or_else(|| CliError::TaskNotFound(task_query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousTaskId(format!(
                "ID prefix '{task_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn task_preview(task: &Task, max_chars: usize) -> String {
    let collapsed = task.task.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_task_lines(tasks: &[Task], now_ms: i64) -> Vec<String> {
    tasks
        .iter()
        .map(|task| {
            let checkbox = if task.completed { "[x]" } else { "[ ]" };
            let id = short_id(&task.client_id.to_string());
            let preview = task_preview(task, 40);
            let relative_time = format_relative_time(task.updated_at, now_ms);
            let pending = if task.is_synced() { "" } else { "  *" };

            format!("{checkbox} {id:<13}  {preview:<40}  {relative_time}{pending}")
        })
        .collect()
}

pub fn task_to_list_item(task: &Task) -> TaskListItem {
    let now_ms = Utc::now().timestamp_millis();

    TaskListItem {
        id: task.client_id.to_string(),
        task: task.task.clone(),
        completed: task.completed,
        synced: task.is_synced(),
        updated_at: task.updated_at,
        relative_time: format_relative_time(task.updated_at, now_ms),
    }
}

pub fn outbox_to_item(entry: &OutboxEntry) -> OutboxItem {
    OutboxItem {
        id: entry.id,
        client_id: entry.client_id.to_string(),
        operation: entry.operation.as_str().to_string(),
        payload: entry.payload.clone(),
        created_at: entry.created_at,
        created_at_iso: format_timestamp(entry.created_at),
    }
}

pub fn format_outbox_lines(entries: &[OutboxEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let payload =
                serde_json::to_string(&entry.payload).unwrap_or_else(|_| "{}".to_string());
            format!(
                "{:>5}  {:<6}  {:<13}  {}  {}",
                entry.id,
                entry.operation.as_str(),
                short_id(&entry.client_id.to_string()),
                format_timestamp(entry.created_at),
                payload
            )
        })
        .collect()
}

pub fn describe_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Empty => "Nothing to sync".to_string(),
        SyncOutcome::Synced {
            sent,
            carried_over: false,
        } => format!("Synced {sent} change(s)"),
        SyncOutcome::Synced {
            sent,
            carried_over: true,
        } => format!("Synced {sent} change(s); newer changes stay queued"),
        SyncOutcome::Failed { reason } => format!("Sync failed: {reason}"),
        SyncOutcome::AlreadyRunning => "Sync already in progress".to_string(),
        SyncOutcome::BackingOff { retry_in } => {
            format!("Backing off; next attempt in {}s", retry_in.as_secs())
        }
        SyncOutcome::NotReady => "Task store not ready yet".to_string(),
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_task_text(text_parts: &[String]) -> Result<String, CliError> {
    if let Some(text) = normalize_content(&text_parts.join(" ")) {
        return Ok(text);
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }

    Err(CliError::EmptyText)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_task_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTaskId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("DITTO_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("ditto")
        .join("ditto.db")
}

/// Sync settings from, in order of precedence: `--endpoint`, the process
/// environment, then the stored config file.
pub fn load_sync_settings(explicit_endpoint: Option<String>) -> Result<SyncSettings, CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    resolve_sync_settings(explicit_endpoint, &config, |name| env::var(name).ok())
}

pub fn resolve_sync_settings(
    explicit_endpoint: Option<String>,
    config: &CliConfig,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<SyncSettings, CliError> {
    let explicit_endpoint = non_blank(explicit_endpoint);
    let settings = SyncSettings::from_lookup(|name| {
        if name == ENV_SYNC_URL {
            if let Some(endpoint) = explicit_endpoint.clone() {
                return Some(endpoint);
            }
        }
        non_blank(env_lookup(name))
            .or_else(|| config.lookup(name))
    })?;

    settings.ok_or(CliError::SyncNotConfigured)
}
