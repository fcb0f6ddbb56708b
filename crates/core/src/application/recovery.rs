// Crash recovery (§9.1 ambient-stack decision)
//
// A single-process daemon cannot legitimately have a `running` run survive its
// own restart, so any such row is orphaned by definition. This is best-effort
// bookkeeping only (§1 Non-goals: "guaranteed quiescence on crash"), not a
// retry or resume mechanism — orphaned runs are closed out as errors.

use crate::port::{RunClose, RunRepository, TimeProvider};
use crate::domain::RunStatus;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RecoveryService {
    run_repo: Arc<dyn RunRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RecoveryService {
    pub fn new(run_repo: Arc<dyn RunRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            run_repo,
            time_provider,
        }
    }

    /// Close out every run still `pending`/`running` at startup. Returns the count.
    pub async fn recover_orphaned_runs(&self) -> crate::error::Result<usize> {
        let orphaned = self.run_repo.list_orphaned().await?;
        if orphaned.is_empty() {
            return Ok(0);
        }

        warn!(count = orphaned.len(), "recovering orphaned runs from a previous process");

        let now = self.time_provider.now_millis();
        for run in &orphaned {
            let duration_ms = now - run.started_at;
            self.run_repo
                .close(
                    run.id,
                    RunClose {
                        status: RunStatus::Error,
                        finished_at: now,
                        duration_ms: duration_ms.max(0),
                        exit_code: None,
                        tokens: None,
                        result_meta: None,
                        error: Some("orphaned at startup".to_string()),
                        stdout_tail: None,
                        stderr_tail: None,
                    },
                )
                .await?;
        }

        info!(count = orphaned.len(), "orphaned run recovery complete");
        Ok(orphaned.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Run, RunTrigger};
    use crate::port::time_provider::SystemTimeProvider;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeRunRepo {
        runs: Mutex<HashMap<i64, Run>>,
    }

    #[async_trait::async_trait]
    impl RunRepository for FakeRunRepo {
        async fn open(&self, run: &Run) -> crate::error::Result<i64> {
            let mut runs = self.runs.lock().unwrap();
            let id = runs.len() as i64 + 1;
            let mut run = run.clone();
            run.id = id;
            runs.insert(id, run);
            Ok(id)
        }

        async fn close(&self, run_id: i64, close: RunClose) -> crate::error::Result<()> {
            let mut runs = self.runs.lock().unwrap();
            if let Some(run) = runs.get_mut(&run_id) {
                run.status = close.status;
                run.finished_at = Some(close.finished_at);
                run.error = close.error;
            }
            Ok(())
        }

        async fn find_by_id(&self, run_id: i64) -> crate::error::Result<Option<Run>> {
            Ok(self.runs.lock().unwrap().get(&run_id).cloned())
        }

        async fn list_for_job(&self, _job_id: &str, _limit: i64) -> crate::error::Result<Vec<Run>> {
            Ok(vec![])
        }

        async fn list_orphaned(&self) -> crate::error::Result<Vec<Run>> {
            Ok(self
                .runs
                .lock()
                .unwrap()
                .values()
                .filter(|r| !r.status.is_terminal())
                .cloned()
                .collect())
        }

        async fn delete_older_than(&self, _cutoff_millis: i64) -> crate::error::Result<u64> {
            Ok(0)
        }

        async fn count_since(&self, _status: RunStatus, _since_millis: i64) -> crate::error::Result<i64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn closes_out_orphaned_runs_as_error() {
        let mut runs = HashMap::new();
        runs.insert(
            1,
            Run::open("job-1", RunTrigger::Schedule, 1_000),
        );
        let repo = Arc::new(FakeRunRepo {
            runs: Mutex::new(runs),
        });
        let time_provider = Arc::new(SystemTimeProvider);
        let recovery = RecoveryService::new(repo.clone(), time_provider);

        let recovered = recovery.recover_orphaned_runs().await.unwrap();
        assert_eq!(recovered, 1);

        let run = repo.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Error);
        assert_eq!(run.error.as_deref(), Some("orphaned at startup"));
    }
}
