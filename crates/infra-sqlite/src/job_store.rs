// SQLite-backed JobStore (§4.1 Store, §3 Job)

use crate::error_map::map_sqlx;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use taskrunner_core::domain::{Job, JobId, JobType, OverlapPolicy};
use taskrunner_core::error::Result;
use taskrunner_core::port::JobStore;

pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<Job> {
        let job_type: String = row.try_get("job_type").map_err(map_sqlx)?;
        let overlap_policy: String = row.try_get("overlap_policy").map_err(map_sqlx)?;

        Ok(Job {
            id: row.try_get("id").map_err(map_sqlx)?,
            name: row.try_get("name").map_err(map_sqlx)?,
            schedule: row.try_get("schedule").map_err(map_sqlx)?,
            script: row.try_get("script").map_err(map_sqlx)?,
            job_type: JobType::from_str(&job_type)?,
            description: row.try_get("description").map_err(map_sqlx)?,
            enabled: row.try_get::<i64, _>("enabled").map_err(map_sqlx)? != 0,
            timeout_ms: row.try_get("timeout_ms").map_err(map_sqlx)?,
            overlap_policy: OverlapPolicy::from_str(&overlap_policy)?,
            on_failure_channel: row.try_get("on_failure_channel").map_err(map_sqlx)?,
            on_success_channel: row.try_get("on_success_channel").map_err(map_sqlx)?,
            created_at: row.try_get("created_at").map_err(map_sqlx)?,
            updated_at: row.try_get("updated_at").map_err(map_sqlx)?,
        })
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            "INSERT INTO jobs (id, name, schedule, script, job_type, description, enabled, \
             timeout_ms, overlap_policy, on_failure_channel, on_success_channel, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&job.id)
        .bind(&job.name)
        .bind(&job.schedule)
        .bind(&job.script)
        .bind(job.job_type.to_string())
        .bind(&job.description)
        .bind(job.enabled as i64)
        .bind(job.timeout_ms)
        .bind(job.overlap_policy.to_string())
        .bind(&job.on_failure_channel)
        .bind(&job.on_success_channel)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.as_ref().map(Self::row_to_job).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn list_enabled(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE enabled = 1 ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn set_enabled(&self, id: &JobId, enabled: bool, now_millis: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE jobs SET enabled = ?, updated_at = ? WHERE id = ?")
            .bind(enabled as i64)
            .bind(now_millis)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_script(&self, id: &JobId, script: &str, now_millis: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE jobs SET script = ?, updated_at = ? WHERE id = ?")
            .bind(script)
            .bind(now_millis)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use crate::migration::run_migrations;

    async fn setup() -> SqliteJobStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobStore::new(pool)
    }

    #[tokio::test]
    async fn inserts_and_finds_job() {
        let store = setup().await;
        let job = Job::new("job-1", "Nightly backup", "0 2 * * *", "backup.sh", JobType::Script, 1000);
        store.insert(&job).await.unwrap();

        let found = store.find_by_id(&"job-1".to_string()).await.unwrap().unwrap();
        assert_eq!(found.name, "Nightly backup");
        assert_eq!(found.job_type, JobType::Script);
    }

    #[tokio::test]
    async fn list_enabled_excludes_disabled_jobs() {
        let store = setup().await;
        let mut job_a = Job::new("a", "A", "0 2 * * *", "a.sh", JobType::Script, 1000);
        let job_b = Job::new("b", "B", "0 3 * * *", "b.sh", JobType::Script, 1000);
        job_a.enabled = false;
        store.insert(&job_a).await.unwrap();
        store.insert(&job_b).await.unwrap();

        let enabled = store.list_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "b");
    }

    #[tokio::test]
    async fn set_enabled_returns_false_for_unknown_job() {
        let store = setup().await;
        assert!(!store.set_enabled(&"nope".to_string(), false, 2000).await.unwrap());
    }

    #[tokio::test]
    async fn update_script_updates_timestamp() {
        let store = setup().await;
        let job = Job::new("job-2", "Report", "0 5 * * *", "old.sh", JobType::Script, 1000);
        store.insert(&job).await.unwrap();

        let updated = store.update_script(&"job-2".to_string(), "new.sh", 5000).await.unwrap();
        assert!(updated);

        let found = store.find_by_id(&"job-2".to_string()).await.unwrap().unwrap();
        assert_eq!(found.script, "new.sh");
        assert_eq!(found.updated_at, 5000);
    }
}
