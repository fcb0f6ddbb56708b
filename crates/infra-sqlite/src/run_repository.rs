// SQLite-backed RunRepository (§3 Run, §4.7, §4.8)

use crate::error_map::map_sqlx;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use taskrunner_core::domain::{Run, RunId, RunStatus, RunTrigger};
use taskrunner_core::error::Result;
use taskrunner_core::port::run_repository::RunClose;
use taskrunner_core::port::RunRepository;

pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_run(row: &sqlx::sqlite::SqliteRow) -> Result<Run> {
        let status: String = row.try_get("status").map_err(map_sqlx)?;
        let trigger: String = row.try_get("trigger").map_err(map_sqlx)?;

        Ok(Run {
            id: row.try_get("id").map_err(map_sqlx)?,
            job_id: row.try_get("job_id").map_err(map_sqlx)?,
            status: RunStatus::from_str(&status)?,
            started_at: row.try_get("started_at").map_err(map_sqlx)?,
            finished_at: row.try_get("finished_at").map_err(map_sqlx)?,
            duration_ms: row.try_get("duration_ms").map_err(map_sqlx)?,
            exit_code: row.try_get("exit_code").map_err(map_sqlx)?,
            tokens: row.try_get("tokens").map_err(map_sqlx)?,
            result_meta: row.try_get("result_meta").map_err(map_sqlx)?,
            error: row.try_get("error").map_err(map_sqlx)?,
            stdout_tail: row.try_get("stdout_tail").map_err(map_sqlx)?,
            stderr_tail: row.try_get("stderr_tail").map_err(map_sqlx)?,
            trigger: RunTrigger::from_str(&trigger)?,
        })
    }
}

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn open(&self, run: &Run) -> Result<RunId> {
        let result = sqlx::query(
            "INSERT INTO runs (job_id, status, started_at, trigger) VALUES (?, ?, ?, ?)",
        )
        .bind(&run.job_id)
        .bind(run.status.to_string())
        .bind(run.started_at)
        .bind(run.trigger.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.last_insert_rowid())
    }

    async fn close(&self, run_id: RunId, close: RunClose) -> Result<()> {
        sqlx::query(
            "UPDATE runs SET status = ?, finished_at = ?, duration_ms = ?, exit_code = ?, \
             tokens = ?, result_meta = ?, error = ?, stdout_tail = ?, stderr_tail = ? WHERE id = ?",
        )
        .bind(close.status.to_string())
        .bind(close.finished_at)
        .bind(close.duration_ms)
        .bind(close.exit_code)
        .bind(close.tokens)
        .bind(&close.result_meta)
        .bind(&close.error)
        .bind(&close.stdout_tail)
        .bind(&close.stderr_tail)
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn find_by_id(&self, run_id: RunId) -> Result<Option<Run>> {
        let row = sqlx::query("SELECT * FROM runs WHERE id = ?")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.as_ref().map(Self::row_to_run).transpose()
    }

    async fn list_for_job(&self, job_id: &str, limit: i64) -> Result<Vec<Run>> {
        let rows = sqlx::query("SELECT * FROM runs WHERE job_id = ? ORDER BY started_at DESC LIMIT ?")
            .bind(job_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter().map(Self::row_to_run).collect()
    }

    async fn list_orphaned(&self) -> Result<Vec<Run>> {
        let rows = sqlx::query("SELECT * FROM runs WHERE status IN ('pending', 'running')")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter().map(Self::row_to_run).collect()
    }

    async fn delete_older_than(&self, cutoff_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM runs WHERE started_at < ?")
            .bind(cutoff_millis)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }

    async fn count_since(&self, status: RunStatus, since_millis: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM runs WHERE status = ? AND started_at >= ?",
        )
        .bind(status.to_string())
        .bind(since_millis)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use crate::job_store::SqliteJobStore;
    use crate::migration::run_migrations;
    use taskrunner_core::domain::{Job, JobType};
    use taskrunner_core::port::JobStore;

    async fn setup() -> (SqliteRunRepository, SqlitePool) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let job_store = SqliteJobStore::new(pool.clone());
        let job = Job::new("job-1", "Nightly", "0 2 * * *", "run.sh", JobType::Script, 1000);
        job_store.insert(&job).await.unwrap();

        (SqliteRunRepository::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn opens_and_closes_a_run() {
        let (repo, _pool) = setup().await;
        let run = Run::open("job-1", RunTrigger::Schedule, 1000);
        let run_id = repo.open(&run).await.unwrap();

        repo.close(
            run_id,
            RunClose {
                status: RunStatus::Ok,
                finished_at: 2000,
                duration_ms: 1000,
                exit_code: Some(0),
                tokens: None,
                result_meta: None,
                error: None,
                stdout_tail: Some("done".to_string()),
                stderr_tail: None,
            },
        )
        .await
        .unwrap();

        let found = repo.find_by_id(run_id).await.unwrap().unwrap();
        assert_eq!(found.status, RunStatus::Ok);
        assert_eq!(found.duration_ms, Some(1000));
    }

    #[tokio::test]
    async fn list_orphaned_returns_only_nonterminal_runs() {
        let (repo, _pool) = setup().await;
        let run = Run::open("job-1", RunTrigger::Schedule, 1000);
        let run_id = repo.open(&run).await.unwrap();

        let orphaned = repo.list_orphaned().await.unwrap();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].id, run_id);

        repo.close(
            run_id,
            RunClose {
                status: RunStatus::Error,
                finished_at: 2000,
                duration_ms: 1000,
                exit_code: None,
                tokens: None,
                result_meta: None,
                error: Some("orphaned at startup".to_string()),
                stdout_tail: None,
                stderr_tail: None,
            },
        )
        .await
        .unwrap();

        assert!(repo.list_orphaned().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_since_filters_by_status_and_window() {
        let (repo, _pool) = setup().await;
        let run = Run::open("job-1", RunTrigger::Schedule, 5000);
        let run_id = repo.open(&run).await.unwrap();
        repo.close(
            run_id,
            RunClose {
                status: RunStatus::Ok,
                finished_at: 6000,
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

        assert_eq!(repo.count_since(RunStatus::Ok, 0).await.unwrap(), 1);
        assert_eq!(repo.count_since(RunStatus::Ok, 10_000).await.unwrap(), 0);
        assert_eq!(repo.count_since(RunStatus::Error, 0).await.unwrap(), 0);
    }
}
