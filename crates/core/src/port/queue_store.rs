// Queue Store Port (§4.3 Queue engine)

use crate::domain::{QueueDefinition, QueueItemId};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// See §4.3 enqueue steps 1-4. Returns `ENQUEUE_DEDUPED` (-1) if a live duplicate
    /// exists, otherwise the new item's id.
    async fn enqueue(
        &self,
        queue_id: &str,
        payload: Value,
        priority: Option<i32>,
        max_attempts_override: Option<i32>,
    ) -> Result<QueueItemId>;

    /// Atomically claims up to `count` pending items, highest priority then oldest
    /// first, marking them `processing` and incrementing `attempts` (§4.3, P3).
    async fn dequeue(&self, queue_id: &str, count: i64) -> Result<Vec<(QueueItemId, Value)>>;

    async fn done(&self, item_id: QueueItemId) -> Result<()>;

    /// Resets to pending if `attempts < max_attempts`, else dead-letters (§3 I5).
    async fn fail(&self, item_id: QueueItemId, error: &str) -> Result<()>;

    async fn get_definition(&self, queue_id: &str) -> Result<Option<QueueDefinition>>;

    /// Deletes completed/failed items past their queue's retention (§4.8).
    async fn delete_retained_past(&self, now_millis: i64) -> Result<u64>;
}
