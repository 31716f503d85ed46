//! Task store: the only way front-ends change task state.
//!
//! Every mutation writes the task row and its outbox entry inside one
//! transaction, so a row is `pending` exactly when the outbox holds work for it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clock::MonotonicClock;
use crate::db::{
    Database, LibSqlOutboxRepository, LibSqlTaskRepository, OutboxRepository, TaskRepository,
};
use crate::models::{Operation, OutboxEntry, Task, TaskId, TaskPayload, TaskView};
use crate::{Error, Result};

/// What a successful sync reconciliation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Outbox entries removed
    pub cleared: u64,
    /// Task rows flipped to `synced`
    pub marked_synced: u64,
    /// Entries queued while the batch was in flight and left for the next cycle
    pub carried_over: bool,
}

/// Thread-safe owner of the task database.
#[derive(Clone)]
pub struct TaskStore {
    db: Arc<Mutex<Database>>,
    clock: Arc<MonotonicClock>,
    db_path: Option<PathBuf>,
}

impl TaskStore {
    /// Open the task store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::debug!("Opened task store at {}", db_path.display());
        Self::from_database(db, Some(db_path)).await
    }

    /// Open an in-memory task store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Self::from_database(db, None).await
    }

    async fn from_database(db: Database, db_path: Option<PathBuf>) -> Result<Self> {
        // Timestamps must keep sorting after everything already persisted
        let floor = {
            let tasks = LibSqlTaskRepository::new(db.connection());
            let outbox = LibSqlOutboxRepository::new(db.connection());
            tasks.max_updated_at().await?.max(outbox.max_created_at().await?)
        };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            clock: Arc::new(MonotonicClock::starting_after(floor)),
            db_path,
        })
    }

    /// Filesystem location of the database, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Create a task and queue its `create` operation.
    pub async fn create(&self, text: &str) -> Result<Task> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("task text cannot be empty".into()));
        }

        let db = self.db.lock().await;

        db.begin().await?;
        let result: Result<Task> = async {
            let now = self.next_timestamp(&db).await?;
            let task = Task::new(text, now);
            LibSqlTaskRepository::new(db.connection())
                .upsert(&task)
                .await?;
            LibSqlOutboxRepository::new(db.connection())
                .enqueue(
                    &task.client_id,
                    Operation::Create,
                    &TaskPayload::for_create(text),
                    now,
                )
                .await?;
            Ok(task)
        }
        .await;
        let task = db.finish(result).await?;

        tracing::debug!(id = %task.client_id, "Created task");
        Ok(task)
    }

    /// Flip a task's completion flag and queue an `update` carrying the new value.
    pub async fn toggle(&self, id: &TaskId) -> Result<Task> {
        let db = self.db.lock().await;

        db.begin().await?;
        let result: Result<Task> = async {
            let now = self.next_timestamp(&db).await?;
            let tasks = LibSqlTaskRepository::new(db.connection());
            if !tasks.toggle_completed(id, now).await? {
                return Err(Error::NotFound(id.to_string()));
            }
            let task = tasks
                .get(id)
                .await?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;

            LibSqlOutboxRepository::new(db.connection())
                .enqueue(
                    id,
                    Operation::Update,
                    &TaskPayload::for_completed(task.completed),
                    now,
                )
                .await?;
            Ok(task)
        }
        .await;
        let task = db.finish(result).await?;

        tracing::debug!(id = %id, completed = task.completed, "Toggled task");
        Ok(task)
    }

    /// Hard-delete a task; earlier queued work for it is replaced by one `delete`.
    pub async fn delete(&self, id: &TaskId) -> Result<()> {
        let db = self.db.lock().await;

        db.begin().await?;
        let result: Result<u64> = async {
            let now = self.next_timestamp(&db).await?;
            if !LibSqlTaskRepository::new(db.connection()).remove(id).await? {
                return Err(Error::NotFound(id.to_string()));
            }
            let outbox = LibSqlOutboxRepository::new(db.connection());
            let superseded = outbox.clear_for(id).await?;
            outbox
                .enqueue(id, Operation::Delete, &TaskPayload::for_delete(), now)
                .await?;
            Ok(superseded)
        }
        .await;
        let superseded = db.finish(result).await?;

        tracing::debug!(id = %id, superseded, "Deleted task");
        Ok(())
    }

    /// Timestamp for a mutation inside an open write transaction.
    ///
    /// Stays above everything persisted, including rows written through
    /// other handles on the same file.
    async fn next_timestamp(&self, db: &Database) -> Result<i64> {
        let floor = LibSqlTaskRepository::new(db.connection())
            .max_updated_at()
            .await?
            .max(
                LibSqlOutboxRepository::new(db.connection())
                    .max_created_at()
                    .await?,
            );
        Ok(self.clock.now_after(floor))
    }

    /// Live tasks as UI views, most recently updated first.
    pub async fn list_live(&self) -> Result<Vec<TaskView>> {
        Ok(self.list_tasks().await?.iter().map(TaskView::from).collect())
    }

    /// Live tasks with every stored field, most recently updated first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection()).list_live().await
    }

    /// Fetch a task by id.
    pub async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection()).get(id).await
    }

    /// Task ids beginning with `prefix`.
    pub async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection())
            .list_ids_by_prefix(prefix, limit)
            .await
    }

    /// Snapshot of the outbox in transmission order.
    pub async fn pending_entries(&self) -> Result<Vec<OutboxEntry>> {
        let db = self.db.lock().await;
        LibSqlOutboxRepository::new(db.connection())
            .drain_ordered()
            .await
    }

    /// Number of queued outbox entries.
    pub async fn pending_count(&self) -> Result<u64> {
        let db = self.db.lock().await;
        LibSqlOutboxRepository::new(db.connection()).count().await
    }

    /// Apply a remote acceptance of every entry up to `last_id`.
    ///
    /// When nothing was queued after the batch, the whole outbox is cleared and
    /// every row marked synced. Otherwise only the acknowledged entries go and
    /// rows that still have queued work stay pending.
    pub async fn reconcile(&self, last_id: i64) -> Result<ReconcileSummary> {
        let db = self.db.lock().await;

        db.begin().await?;
        let result: Result<ReconcileSummary> = async {
            let tasks = LibSqlTaskRepository::new(db.connection());
            let outbox = LibSqlOutboxRepository::new(db.connection());

            let carried_over = outbox.max_id().await?.is_some_and(|max| max > last_id);
            let summary = if carried_over {
                ReconcileSummary {
                    cleared: outbox.clear_through(last_id).await?,
                    marked_synced: tasks.mark_synced_without_pending().await?,
                    carried_over,
                }
            } else {
                ReconcileSummary {
                    cleared: outbox.clear_all().await?,
                    marked_synced: tasks.mark_all_synced().await?,
                    carried_over,
                }
            };
            Ok(summary)
        }
        .await;
        db.finish(result).await
    }
}
