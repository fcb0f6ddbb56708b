// SQLite-backed Maintenance (§4.8 retention sweeps)

use crate::error_map::map_sqlx;
use async_trait::async_trait;
use sqlx::SqlitePool;
use taskrunner_core::domain::queue::DEFAULT_RETENTION_DAYS;
use taskrunner_core::error::Result;
use taskrunner_core::port::Maintenance;

pub struct SqliteMaintenance {
    pool: SqlitePool,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn gc_runs(&self, retention_days: i64) -> Result<u64> {
        let cutoff = Self::now_millis() - retention_days * 86_400_000;

        let result = sqlx::query("DELETE FROM runs WHERE started_at < ? AND status NOT IN ('pending', 'running')")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }

    async fn gc_expired_state(&self) -> Result<u64> {
        let now = Self::now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            "DELETE FROM state_items WHERE (namespace, key) IN ( \
                SELECT namespace, key FROM state WHERE expires_at IS NOT NULL AND expires_at <= ? \
             )",
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let result = sqlx::query("DELETE FROM state WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn gc_queue_items(&self) -> Result<u64> {
        let now = Self::now_millis();

        let result = sqlx::query(
            "DELETE FROM queue_items WHERE status IN ('done', 'failed') AND finished_at IS NOT NULL \
             AND finished_at <= ? - (COALESCE( \
                (SELECT retention_days FROM queue_defs WHERE queue_defs.id = queue_items.queue_id), \
                ?) * 86400000)",
        )
        .bind(now)
        .bind(DEFAULT_RETENTION_DAYS)
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
    use crate::run_repository::SqliteRunRepository;
    use taskrunner_core::domain::{Run, RunStatus, RunTrigger};
    use taskrunner_core::port::run_repository::RunClose;
    use taskrunner_core::port::RunRepository;

    #[tokio::test]
    async fn gc_runs_deletes_only_terminal_runs_past_retention() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO jobs (id, name, schedule, script, job_type, enabled, overlap_policy, created_at, updated_at) VALUES ('j1', 'J', '0 2 * * *', 's.sh', 'script', 1, 'skip', 0, 0)")
            .execute(&pool)
            .await
            .unwrap();

        let repo = SqliteRunRepository::new(pool.clone());
        let old_run = Run::open("j1", RunTrigger::Schedule, 0);
        let run_id = repo.open(&old_run).await.unwrap();
        repo.close(
            run_id,
            RunClose {
                status: RunStatus::Ok,
                finished_at: 1000,
                duration_ms: 1000,
                exit_code: Some(0),
                tokens: None,
                result_meta: None,
                error: None,
                stdout_tail: None,
                stderr_tail: None,
            },
        )
        .await
        .unwrap();

        let maintenance = SqliteMaintenance::new(pool);
        let deleted = maintenance.gc_runs(0).await.unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn gc_expired_state_removes_expired_rows_and_items() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO state (namespace, key, value, expires_at, updated_at) VALUES ('ns', 'k', 'v', -1, 0)")
            .execute(&pool)
            .await
            .unwrap();

        let maintenance = SqliteMaintenance::new(pool);
        let deleted = maintenance.gc_expired_state().await.unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn gc_queue_items_respects_retention() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO queue_items (queue_id, payload, status, priority, attempts, max_attempts, created_at, finished_at) \
             VALUES ('q1', '{}', 'done', 0, 1, 1, 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let maintenance = SqliteMaintenance::new(pool);
        let deleted = maintenance.gc_queue_items().await.unwrap();
        assert_eq!(deleted, 1);
    }
}
