// SQLite-backed StateStore (§4.2 State engine)

use crate::error_map::map_sqlx;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use taskrunner_core::error::Result;
use taskrunner_core::port::state_store::ItemOrder;
use taskrunner_core::port::StateStore;

pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT value, expires_at FROM state WHERE namespace = ? AND key = ?",
        )
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else { return Ok(None) };
        let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx)?;
        if let Some(expires_at) = expires_at {
            if expires_at <= Self::now_millis() {
                return Ok(None);
            }
        }
        Ok(row.try_get("value").map_err(map_sqlx)?)
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl_millis: Option<i64>,
    ) -> Result<()> {
        let now = Self::now_millis();
        let expires_at = ttl_millis.map(|ttl| now + ttl);

        sqlx::query(
            "INSERT INTO state (namespace, key, value, expires_at, updated_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at, updated_at = excluded.updated_at",
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("DELETE FROM state_items WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        sqlx::query("DELETE FROM state WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn has_item(&self, namespace: &str, key: &str, item_key: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM state_items WHERE namespace = ? AND key = ? AND item_key = ?",
        )
        .bind(namespace)
        .bind(key)
        .bind(item_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.is_some())
    }

    async fn get_item(&self, namespace: &str, key: &str, item_key: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT value FROM state_items WHERE namespace = ? AND key = ? AND item_key = ?",
        )
        .bind(namespace)
        .bind(key)
        .bind(item_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(|r| r.try_get("value").map_err(map_sqlx)).transpose()
    }

    async fn set_item(
        &self,
        namespace: &str,
        key: &str,
        item_key: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let now = Self::now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // Auto-create the parent state row (value NULL) on first item (§4.2).
        sqlx::query(
            "INSERT INTO state (namespace, key, value, expires_at, updated_at) VALUES (?, ?, NULL, NULL, ?) \
             ON CONFLICT(namespace, key) DO NOTHING",
        )
        .bind(namespace)
        .bind(key)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            "INSERT INTO state_items (namespace, key, item_key, value, updated_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(namespace, key, item_key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(namespace)
        .bind(key)
        .bind(item_key)
        .bind(value)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete_item(&self, namespace: &str, key: &str, item_key: &str) -> Result<()> {
        sqlx::query("DELETE FROM state_items WHERE namespace = ? AND key = ? AND item_key = ?")
            .bind(namespace)
            .bind(key)
            .bind(item_key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn count_items(&self, namespace: &str, key: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM state_items WHERE namespace = ? AND key = ?",
        )
        .bind(namespace)
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(count)
    }

    async fn prune_items(&self, namespace: &str, key: &str, keep_count: i64) -> Result<i64> {
        let result = sqlx::query(
            "DELETE FROM state_items WHERE namespace = ? AND key = ? AND item_key NOT IN ( \
                SELECT item_key FROM state_items WHERE namespace = ? AND key = ? \
                ORDER BY updated_at DESC LIMIT ? \
             )",
        )
        .bind(namespace)
        .bind(key)
        .bind(namespace)
        .bind(key)
        .bind(keep_count)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.rows_affected() as i64)
    }

    async fn list_item_keys(
        &self,
        namespace: &str,
        key: &str,
        limit: Option<i64>,
        order: ItemOrder,
    ) -> Result<Vec<String>> {
        let order_clause = match order {
            ItemOrder::Asc => "ASC",
            ItemOrder::Desc => "DESC",
        };
        let limit = limit.unwrap_or(-1);

        let query = format!(
            "SELECT item_key FROM state_items WHERE namespace = ? AND key = ? \
             ORDER BY updated_at {order_clause} LIMIT ?"
        );

        let rows = sqlx::query(&query)
            .bind(namespace)
            .bind(key)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter()
            .map(|r| r.try_get("item_key").map_err(map_sqlx))
            .collect()
    }

    async fn delete_expired(&self, now_millis: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            "DELETE FROM state_items WHERE (namespace, key) IN ( \
                SELECT namespace, key FROM state WHERE expires_at IS NOT NULL AND expires_at <= ? \
             )",
        )
        .bind(now_millis)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let result = sqlx::query("DELETE FROM state WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now_millis)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use crate::migration::run_migrations;

    async fn setup() -> SqliteStateStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteStateStore::new(pool)
    }

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let store = setup().await;
        store.set("ns", "k1", "hello", None).await.unwrap();
        assert_eq!(store.get("ns", "k1").await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_is_invisible_to_get() {
        let store = setup().await;
        store.set("ns", "k1", "hello", Some(-1)).await.unwrap();
        assert_eq!(store.get("ns", "k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_item_auto_creates_parent_row() {
        let store = setup().await;
        store.set_item("ns", "coll", "item1", Some("v1")).await.unwrap();
        assert_eq!(store.count_items("ns", "coll").await.unwrap(), 1);
        assert!(store.has_item("ns", "coll", "item1").await.unwrap());
    }

    #[tokio::test]
    async fn prune_items_keeps_most_recent() {
        let store = setup().await;
        store.set_item("ns", "coll", "a", Some("1")).await.unwrap();
        store.set_item("ns", "coll", "b", Some("2")).await.unwrap();
        store.set_item("ns", "coll", "c", Some("3")).await.unwrap();

        let deleted = store.prune_items("ns", "coll", 2).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count_items("ns", "coll").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_expired_removes_only_past_entries() {
        let store = setup().await;
        store.set("ns", "alive", "x", Some(1_000_000)).await.unwrap();
        store.set("ns", "dead", "x", Some(-1)).await.unwrap();

        let now = chrono::Utc::now().timestamp_millis();
        let removed = store.delete_expired(now).await.unwrap();
        assert_eq!(removed, 1);
    }
}
