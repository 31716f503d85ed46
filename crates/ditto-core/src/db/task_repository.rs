//! Task repository implementation

use crate::error::{Error, Result};
use crate::models::{SyncStatus, Task, TaskId};
use libsql::Connection;

/// Trait for task storage operations (async)
#[allow(async_fn_in_trait)]
pub trait TaskRepository {
    /// Insert a task or overwrite the row with the same `client_id`
    async fn upsert(&self, task: &Task) -> Result<()>;

    /// Get a task by ID
    async fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// List tasks that are not tombstoned, most recently updated first
    async fn list_live(&self) -> Result<Vec<Task>>;

    /// Flip a task's completion flag and mark it pending; `false` if no row matched
    async fn toggle_completed(&self, id: &TaskId, now: i64) -> Result<bool>;

    /// Permanently remove a task; `false` if no row matched
    async fn remove(&self, id: &TaskId) -> Result<bool>;

    /// Mark every row synced
    async fn mark_all_synced(&self) -> Result<u64>;

    /// Mark synced only the rows that have nothing left in the outbox
    async fn mark_synced_without_pending(&self) -> Result<u64>;

    /// IDs starting with `prefix`, most recently updated first
    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Largest `updated_at` stored, 0 for an empty table
    async fn max_updated_at(&self) -> Result<i64>;
}

/// libSQL implementation of `TaskRepository`
pub struct LibSqlTaskRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTaskRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a task from a database row
    fn parse_task(row: &libsql::Row) -> Result<Task> {
        let id: String = row.get(0)?;
        let status: String = row.get(5)?;
        Ok(Task {
            client_id: id
                .parse()
                .map_err(|e| Error::Database(format!("invalid task id '{id}': {e}")))?,
            task: row.get(1)?,
            completed: row.get::<i64>(2)? != 0,
            deleted: row.get::<i64>(3)? != 0,
            updated_at: row.get(4)?,
            sync_status: status.parse::<SyncStatus>().map_err(Error::Database)?,
        })
    }
}

impl TaskRepository for LibSqlTaskRepository<'_> {
    async fn upsert(&self, task: &Task) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO tasks (client_id, task, completed, deleted, updated_at, sync_status)
                 VALUES (?, ?, ?, ?, ?, ?)",
                libsql::params![
                    task.client_id.as_str(),
                    task.task.as_str(),
                    i64::from(task.completed),
                    i64::from(task.deleted),
                    task.updated_at,
                    task.sync_status.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let mut rows = self
            .conn
            .query(
                "SELECT client_id, task, completed, deleted, updated_at, sync_status
                 FROM tasks WHERE client_id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_live(&self) -> Result<Vec<Task>> {
        let mut rows = self
            .conn
            .query(
                "SELECT client_id, task, completed, deleted, updated_at, sync_status
                 FROM tasks
                 WHERE deleted = 0
                 ORDER BY updated_at DESC",
                (),
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(Self::parse_task(&row)?);
        }
        Ok(tasks)
    }

    async fn toggle_completed(&self, id: &TaskId, now: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks
                 SET completed = CASE completed WHEN 1 THEN 0 ELSE 1 END,
                     updated_at = ?,
                     sync_status = 'pending'
                 WHERE client_id = ? AND deleted = 0",
                libsql::params![now, id.as_str()],
            )
            .await?;
        Ok(changed > 0)
    }

    async fn remove(&self, id: &TaskId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM tasks WHERE client_id = ?", [id.as_str()])
            .await?;
        Ok(removed > 0)
    }

    async fn mark_all_synced(&self) -> Result<u64> {
        let marked = self
            .conn
            .execute(
                "UPDATE tasks SET sync_status = 'synced' WHERE sync_status != 'synced'",
                (),
            )
            .await?;
        Ok(marked)
    }

    async fn mark_synced_without_pending(&self) -> Result<u64> {
        let marked = self
            .conn
            .execute(
                "UPDATE tasks SET sync_status = 'synced'
                 WHERE sync_status != 'synced'
                   AND NOT EXISTS (SELECT 1 FROM outbox o WHERE o.client_id = tasks.client_id)",
                (),
            )
            .await?;
        Ok(marked)
    }

    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT client_id FROM tasks
                 WHERE substr(client_id, 1, length(?1)) = ?1 AND deleted = 0
                 ORDER BY updated_at DESC
                 LIMIT ?2",
                libsql::params![prefix, limit],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    async fn max_updated_at(&self) -> Result<i64> {
        let mut rows = self
            .conn
            .query("SELECT COALESCE(MAX(updated_at), 0) FROM tasks", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}
