// State Store Port (§4.2 State engine)

use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrder {
    Asc,
    Desc,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// `ttl_millis`, if set, is an offset from now; the store computes an absolute expiry.
    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl_millis: Option<i64>,
    ) -> Result<()>;

    async fn delete(&self, namespace: &str, key: &str) -> Result<()>;

    async fn has_item(&self, namespace: &str, key: &str, item_key: &str) -> Result<bool>;
    async fn get_item(&self, namespace: &str, key: &str, item_key: &str) -> Result<Option<String>>;

    /// Ensures the parent state row exists (value NULL) then upserts the item (§4.2).
    async fn set_item(
        &self,
        namespace: &str,
        key: &str,
        item_key: &str,
        value: Option<&str>,
    ) -> Result<()>;

    async fn delete_item(&self, namespace: &str, key: &str, item_key: &str) -> Result<()>;
    async fn count_items(&self, namespace: &str, key: &str) -> Result<i64>;

    /// Deletes items for (namespace, key) not among the `keep_count` most recently
    /// updated; returns the number deleted (§4.2).
    async fn prune_items(&self, namespace: &str, key: &str, keep_count: i64) -> Result<i64>;

    async fn list_item_keys(
        &self,
        namespace: &str,
        key: &str,
        limit: Option<i64>,
        order: ItemOrder,
    ) -> Result<Vec<String>>;

    /// Deletes rows whose `expires_at` is in the past (§4.8 state expiry sweep).
    async fn delete_expired(&self, now_millis: i64) -> Result<u64>;
}
