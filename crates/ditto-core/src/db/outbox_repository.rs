//! Outbox repository implementation

use crate::error::{Error, Result};
use crate::models::{Operation, OutboxEntry, TaskId, TaskPayload};
use libsql::Connection;

/// Trait for outbox storage operations (async)
#[allow(async_fn_in_trait)]
pub trait OutboxRepository {
    /// Append an entry; the database assigns the next sequence id
    async fn enqueue(
        &self,
        client_id: &TaskId,
        operation: Operation,
        payload: &TaskPayload,
        timestamp: i64,
    ) -> Result<OutboxEntry>;

    /// All entries in the order they must be transmitted; does not remove them
    async fn drain_ordered(&self) -> Result<Vec<OutboxEntry>>;

    /// Remove every entry
    async fn clear_all(&self) -> Result<u64>;

    /// Remove entries up to and including sequence id `last_id`
    async fn clear_through(&self, last_id: i64) -> Result<u64>;

    /// Remove every entry queued for one task
    async fn clear_for(&self, client_id: &TaskId) -> Result<u64>;

    /// Number of queued entries
    async fn count(&self) -> Result<u64>;

    /// Highest sequence id currently queued
    async fn max_id(&self) -> Result<Option<i64>>;

    /// Largest `created_at` queued, 0 for an empty outbox
    async fn max_created_at(&self) -> Result<i64>;
}

/// libSQL implementation of `OutboxRepository`
pub struct LibSqlOutboxRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlOutboxRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an outbox entry from a database row
    fn parse_entry(row: &libsql::Row) -> Result<OutboxEntry> {
        let client_id: String = row.get(1)?;
        let operation: String = row.get(2)?;
        let payload: String = row.get(3)?;
        Ok(OutboxEntry {
            id: row.get(0)?,
            client_id: client_id
                .parse()
                .map_err(|e| Error::Database(format!("invalid task id '{client_id}': {e}")))?,
            operation: operation.parse().map_err(Error::Database)?,
            payload: serde_json::from_str(&payload)?,
            created_at: row.get(4)?,
        })
    }

    async fn scalar_i64(&self, sql: &str) -> Result<i64> {
        let mut rows = self.conn.query(sql, ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}

impl OutboxRepository for LibSqlOutboxRepository<'_> {
    async fn enqueue(
        &self,
        client_id: &TaskId,
        operation: Operation,
        payload: &TaskPayload,
        timestamp: i64,
    ) -> Result<OutboxEntry> {
        let payload_json = serde_json::to_string(payload)?;
        self.conn
            .execute(
                "INSERT INTO outbox (client_id, operation, payload, created_at) VALUES (?, ?, ?, ?)",
                libsql::params![
                    client_id.as_str(),
                    operation.as_str(),
                    payload_json,
                    timestamp
                ],
            )
            .await?;

        Ok(OutboxEntry {
            id: self.conn.last_insert_rowid(),
            client_id: *client_id,
            operation,
            payload: payload.clone(),
            created_at: timestamp,
        })
    }

    async fn drain_ordered(&self) -> Result<Vec<OutboxEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, client_id, operation, payload, created_at
                 FROM outbox
                 ORDER BY id ASC",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }

    async fn clear_all(&self) -> Result<u64> {
        Ok(self.conn.execute("DELETE FROM outbox", ()).await?)
    }

    async fn clear_through(&self, last_id: i64) -> Result<u64> {
        Ok(self
            .conn
            .execute("DELETE FROM outbox WHERE id <= ?", [last_id])
            .await?)
    }

    async fn clear_for(&self, client_id: &TaskId) -> Result<u64> {
        Ok(self
            .conn
            .execute("DELETE FROM outbox WHERE client_id = ?", [client_id.as_str()])
            .await?)
    }

    async fn count(&self) -> Result<u64> {
        let count = self.scalar_i64("SELECT COUNT(*) FROM outbox").await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn max_id(&self) -> Result<Option<i64>> {
        // AUTOINCREMENT ids start at 1, so 0 means empty
        let max = self
            .scalar_i64("SELECT COALESCE(MAX(id), 0) FROM outbox")
            .await?;
        Ok((max > 0).then_some(max))
    }

    async fn max_created_at(&self) -> Result<i64> {
        self.scalar_i64("SELECT COALESCE(MAX(created_at), 0) FROM outbox")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_assigns_increasing_ids() {
        let db = setup().await;
        let repo = LibSqlOutboxRepository::new(db.connection());
        let id = TaskId::new();

        let first = repo
            .enqueue(&id, Operation::Create, &TaskPayload::for_create("a"), 10)
            .await
            .unwrap();
        let second = repo
            .enqueue(&id, Operation::Update, &TaskPayload::for_completed(true), 11)
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.max_id().await.unwrap(), Some(second.id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ids_are_not_reused_after_clear() {
        let db = setup().await;
        let repo = LibSqlOutboxRepository::new(db.connection());
        let id = TaskId::new();

        let first = repo
            .enqueue(&id, Operation::Create, &TaskPayload::for_create("a"), 10)
            .await
            .unwrap();
        repo.clear_all().await.unwrap();
        let second = repo
            .enqueue(&id, Operation::Delete, &TaskPayload::for_delete(), 11)
            .await
            .unwrap();

        assert!(second.id > first.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drain_ordered_returns_insertion_order_without_removing() {
        let db = setup().await;
        let repo = LibSqlOutboxRepository::new(db.connection());
        let a = TaskId::new();
        let b = TaskId::new();

        repo.enqueue(&a, Operation::Create, &TaskPayload::for_create("a"), 10)
            .await
            .unwrap();
        repo.enqueue(&b, Operation::Create, &TaskPayload::for_create("b"), 11)
            .await
            .unwrap();
        repo.enqueue(&a, Operation::Update, &TaskPayload::for_completed(true), 12)
            .await
            .unwrap();

        let drained = repo.drain_ordered().await.unwrap();
        let order = drained
            .iter()
            .map(|entry| (entry.client_id, entry.operation))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                (a, Operation::Create),
                (b, Operation::Create),
                (a, Operation::Update)
            ]
        );
        assert_eq!(drained[2].payload, TaskPayload::for_completed(true));
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drain_follows_ids_even_when_timestamps_disagree() {
        let db = setup().await;
        let repo = LibSqlOutboxRepository::new(db.connection());
        let id = TaskId::new();

        let create = repo
            .enqueue(&id, Operation::Create, &TaskPayload::for_create("a"), 500)
            .await
            .unwrap();
        let update = repo
            .enqueue(&id, Operation::Update, &TaskPayload::for_completed(true), 100)
            .await
            .unwrap();

        assert_eq!(repo.drain_ordered().await.unwrap(), vec![create, update]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_for_only_touches_one_task() {
        let db = setup().await;
        let repo = LibSqlOutboxRepository::new(db.connection());
        let a = TaskId::new();
        let b = TaskId::new();

        repo.enqueue(&a, Operation::Create, &TaskPayload::for_create("a"), 10)
            .await
            .unwrap();
        repo.enqueue(&b, Operation::Create, &TaskPayload::for_create("b"), 11)
            .await
            .unwrap();
        repo.enqueue(&a, Operation::Update, &TaskPayload::for_completed(true), 12)
            .await
            .unwrap();

        assert_eq!(repo.clear_for(&a).await.unwrap(), 2);
        let remaining = repo.drain_ordered().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].client_id, b);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_through_keeps_later_entries() {
        let db = setup().await;
        let repo = LibSqlOutboxRepository::new(db.connection());
        let id = TaskId::new();

        let first = repo
            .enqueue(&id, Operation::Create, &TaskPayload::for_create("a"), 10)
            .await
            .unwrap();
        let later = repo
            .enqueue(&id, Operation::Update, &TaskPayload::for_completed(true), 11)
            .await
            .unwrap();

        assert_eq!(repo.clear_through(first.id).await.unwrap(), 1);
        let remaining = repo.drain_ordered().await.unwrap();
        assert_eq!(remaining, vec![later]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_outbox_scalars() {
        let db = setup().await;
        let repo = LibSqlOutboxRepository::new(db.connection());

        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.max_id().await.unwrap(), None);
        assert_eq!(repo.max_created_at().await.unwrap(), 0);
        assert!(repo.drain_ordered().await.unwrap().is_empty());
    }
}
