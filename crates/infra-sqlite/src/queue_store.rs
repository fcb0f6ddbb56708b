// SQLite-backed QueueStore (§4.3 Queue engine)

use crate::error_map::map_sqlx;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use taskrunner_core::domain::queue::{evaluate_dedup_path, ENQUEUE_DEDUPED};
use taskrunner_core::domain::{DedupScope, QueueDefinition, QueueItemId};
use taskrunner_core::error::Result;
use taskrunner_core::port::QueueStore;

pub struct SqliteQueueStore {
    pool: SqlitePool,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn definition_or_default(&self, queue_id: &str) -> Result<QueueDefinition> {
        Ok(self
            .get_definition(queue_id)
            .await?
            .unwrap_or_else(|| QueueDefinition::new(queue_id, queue_id)))
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(
        &self,
        queue_id: &str,
        payload: serde_json::Value,
        priority: Option<i32>,
        max_attempts_override: Option<i32>,
    ) -> Result<QueueItemId> {
        let definition = self.definition_or_default(queue_id).await?;

        let dedup_key = definition
            .dedup_expr
            .as_deref()
            .and_then(|expr| evaluate_dedup_path(&payload, expr));

        if let Some(ref dedup_key) = dedup_key {
            let statuses: Vec<String> = definition
                .dedup_scope
                .matching_statuses()
                .iter()
                .map(|s| s.to_string())
                .collect();
            let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let query = format!(
                "SELECT 1 FROM queue_items WHERE queue_id = ? AND dedup_key = ? AND status IN ({placeholders}) LIMIT 1"
            );

            let mut q = sqlx::query(&query).bind(queue_id).bind(dedup_key);
            for status in &statuses {
                q = q.bind(status);
            }

            let existing = q.fetch_optional(&self.pool).await.map_err(map_sqlx)?;
            if existing.is_some() {
                return Ok(ENQUEUE_DEDUPED);
            }
        }

        let max_attempts = max_attempts_override.unwrap_or(definition.max_attempts);
        let now = Self::now_millis();

        let result = sqlx::query(
            "INSERT INTO queue_items (queue_id, payload, status, priority, attempts, max_attempts, dedup_key, created_at) \
             VALUES (?, ?, 'pending', ?, 0, ?, ?, ?)",
        )
        .bind(queue_id)
        .bind(payload.to_string())
        .bind(priority.unwrap_or(0))
        .bind(max_attempts)
        .bind(&dedup_key)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.last_insert_rowid())
    }

    async fn dequeue(&self, queue_id: &str, count: i64) -> Result<Vec<(QueueItemId, serde_json::Value)>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let rows = sqlx::query(
            "SELECT id, payload FROM queue_items WHERE queue_id = ? AND status = 'pending' \
             ORDER BY priority DESC, created_at ASC LIMIT ?",
        )
        .bind(queue_id)
        .bind(count)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let mut claimed = Vec::with_capacity(rows.len());
        let now = Self::now_millis();

        for row in &rows {
            let id: QueueItemId = row.try_get("id").map_err(map_sqlx)?;
            let payload_str: String = row.try_get("payload").map_err(map_sqlx)?;
            let payload: serde_json::Value = serde_json::from_str(&payload_str)?;

            sqlx::query(
                "UPDATE queue_items SET status = 'processing', attempts = attempts + 1, claimed_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

            claimed.push((id, payload));
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(claimed)
    }

    async fn done(&self, item_id: QueueItemId) -> Result<()> {
        let now = Self::now_millis();
        sqlx::query("UPDATE queue_items SET status = 'done', finished_at = ? WHERE id = ?")
            .bind(now)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fail(&self, item_id: QueueItemId, error: &str) -> Result<()> {
        let row = sqlx::query("SELECT queue_id, attempts, max_attempts FROM queue_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let Some(row) = row else {
            return Err(taskrunner_core::AppError::NotFound(format!("queue item {item_id}")));
        };

        let attempts: i32 = row.try_get("attempts").map_err(map_sqlx)?;
        let max_attempts: i32 = row.try_get("max_attempts").map_err(map_sqlx)?;
        let now = Self::now_millis();

        if attempts >= max_attempts {
            sqlx::query(
                "UPDATE queue_items SET status = 'failed', error = ?, finished_at = ? WHERE id = ?",
            )
            .bind(error)
            .bind(now)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        } else {
            sqlx::query(
                "UPDATE queue_items SET status = 'pending', error = ?, claimed_at = NULL WHERE id = ?",
            )
            .bind(error)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        }

        Ok(())
    }

    async fn get_definition(&self, queue_id: &str) -> Result<Option<QueueDefinition>> {
        let row = sqlx::query("SELECT * FROM queue_defs WHERE id = ?")
            .bind(queue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let Some(row) = row else { return Ok(None) };
        let dedup_scope: String = row.try_get("dedup_scope").map_err(map_sqlx)?;

        Ok(Some(QueueDefinition {
            id: row.try_get("id").map_err(map_sqlx)?,
            name: row.try_get("name").map_err(map_sqlx)?,
            dedup_expr: row.try_get("dedup_expr").map_err(map_sqlx)?,
            dedup_scope: DedupScope::from_str(&dedup_scope)?,
            max_attempts: row.try_get("max_attempts").map_err(map_sqlx)?,
            retention_days: row.try_get("retention_days").map_err(map_sqlx)?,
        }))
    }

    async fn delete_retained_past(&self, now_millis: i64) -> Result<u64> {
        // Each queue's own retention_days (falling back to the domain default
        // for undeclared queues) bounds how long done/failed items are kept.
        let result = sqlx::query(
            "DELETE FROM queue_items WHERE status IN ('done', 'failed') AND finished_at IS NOT NULL \
             AND finished_at <= ? - (COALESCE( \
                (SELECT retention_days FROM queue_defs WHERE queue_defs.id = queue_items.queue_id), \
                ?) * 86400000)",
        )
        .bind(now_millis)
        .bind(taskrunner_core::domain::queue::DEFAULT_RETENTION_DAYS)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use crate::migration::run_migrations;
    use serde_json::json;

    async fn setup() -> SqliteQueueStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteQueueStore::new(pool)
    }

    #[tokio::test]
    async fn enqueue_and_dequeue_roundtrip() {
        let store = setup().await;
        let id = store.enqueue("q1", json!({"a": 1}), None, None).await.unwrap();
        assert!(id > 0);

        let items = store.dequeue("q1", 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0, id);
    }

    #[tokio::test]
    async fn dequeue_respects_priority_then_fifo() {
        let store = setup().await;
        let low = store.enqueue("q1", json!({"n": 1}), Some(0), None).await.unwrap();
        let high = store.enqueue("q1", json!({"n": 2}), Some(10), None).await.unwrap();

        let items = store.dequeue("q1", 10).await.unwrap();
        assert_eq!(items[0].0, high);
        assert_eq!(items[1].0, low);
    }

    #[tokio::test]
    async fn dequeue_does_not_return_same_item_twice() {
        let store = setup().await;
        store.enqueue("q1", json!({"a": 1}), None, None).await.unwrap();

        let first = store.dequeue("q1", 10).await.unwrap();
        let second = store.dequeue("q1", 10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 0);
    }

    #[tokio::test]
    async fn fail_dead_letters_after_max_attempts() {
        let store = setup().await;
        let id = store.enqueue("q1", json!({"a": 1}), None, Some(1)).await.unwrap();
        store.dequeue("q1", 10).await.unwrap();

        store.fail(id, "boom").await.unwrap();

        // max_attempts=1, attempts is now 1 -> dead-lettered, never re-dequeued.
        let items = store.dequeue("q1", 10).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn fail_resets_to_pending_when_attempts_remain() {
        let store = setup().await;
        let id = store.enqueue("q1", json!({"a": 1}), None, Some(3)).await.unwrap();
        store.dequeue("q1", 10).await.unwrap();

        store.fail(id, "transient").await.unwrap();

        let items = store.dequeue("q1", 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0, id);
    }
}
