// Run controller (§4.7) — the central `runJob` protocol.
//
// Owns the concurrency cap and overlap policy, opens/closes run records, and
// dispatches notifications. The cron registry calls back into this through
// `on_scheduled_run`; the HTTP API calls `trigger_job` for manual runs.

use crate::application::constants::SHUTDOWN_POLL_INTERVAL;
use crate::domain::{Job, JobId, JobType, OverlapPolicy, Run, RunStatus, RunTrigger};
use crate::error::{AppError, Result};
use crate::port::{JobStore, Notifier, RunClose, RunRepository, TaskExecutor, TimeProvider};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub struct RunController {
    job_store: Arc<dyn JobStore>,
    run_repo: Arc<dyn RunRepository>,
    script_executor: Arc<dyn TaskExecutor>,
    session_executor: Arc<dyn TaskExecutor>,
    notifier: Arc<dyn Notifier>,
    time_provider: Arc<dyn TimeProvider>,
    max_concurrency: usize,
    running: Mutex<HashSet<JobId>>,
}

impl RunController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_store: Arc<dyn JobStore>,
        run_repo: Arc<dyn RunRepository>,
        script_executor: Arc<dyn TaskExecutor>,
        session_executor: Arc<dyn TaskExecutor>,
        notifier: Arc<dyn Notifier>,
        time_provider: Arc<dyn TimeProvider>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            job_store,
            run_repo,
            script_executor,
            session_executor,
            notifier,
            time_provider,
            max_concurrency,
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().unwrap().len()
    }

    /// §4.6: the cron callback re-reads the job row before calling this, so a
    /// disabled or deleted job never reaches here. Overlap policy is applied
    /// here, not inside `run_job`, precisely so `trigger_job` can bypass it.
    pub async fn on_scheduled_run(&self, job: &Job) {
        let already_running = self.running.lock().unwrap().contains(&job.id);
        if already_running {
            match job.overlap_policy {
                OverlapPolicy::Skip | OverlapPolicy::Queue => {
                    info!(job_id = %job.id, policy = %job.overlap_policy, "skipping scheduled fire: already running");
                    return;
                }
                OverlapPolicy::Allow => {}
            }
        }

        if let Err(e) = self.run_job(job, RunTrigger::Schedule).await {
            error!(job_id = %job.id, error = %e, "scheduled run failed");
        }
    }

    /// Manual trigger (§6 POST /jobs/:id/run). Bypasses overlap policy by design (§4.7).
    pub async fn trigger_job(&self, id: &str) -> Result<crate::port::ExecutionResult> {
        let job = self
            .job_store
            .find_by_id(&id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job not found: {id}")))?;

        self.run_job(&job, RunTrigger::Manual).await
    }

    async fn run_job(&self, job: &Job, trigger: RunTrigger) -> Result<crate::port::ExecutionResult> {
        {
            let mut running = self.running.lock().unwrap();
            if running.len() >= self.max_concurrency {
                return Err(AppError::Backpressure(format!(
                    "concurrency cap ({}) reached",
                    self.max_concurrency
                )));
            }
            running.insert(job.id.clone());
        }

        let result = self.run_job_inner(job, trigger).await;
        self.running.lock().unwrap().remove(&job.id);
        result
    }

    async fn run_job_inner(
        &self,
        job: &Job,
        trigger: RunTrigger,
    ) -> Result<crate::port::ExecutionResult> {
        let started_at = self.time_provider.now_millis();
        let run = Run::open(job.id.clone(), trigger, started_at);
        let run_id = self.run_repo.open(&run).await?;

        let executor: &Arc<dyn TaskExecutor> = match job.job_type {
            JobType::Script => &self.script_executor,
            JobType::Session => &self.session_executor,
        };

        let exec_start = Instant::now();
        let exec_result = executor.execute(job, run_id).await;
        let duration_ms = exec_start.elapsed().as_millis() as i64;
        let finished_at = self.time_provider.now_millis();

        let result = match exec_result {
            Ok(r) => r,
            Err(e) => crate::port::ExecutionResult {
                status: RunStatus::Error,
                duration_ms,
                exit_code: None,
                tokens: None,
                result_meta: None,
                error: Some(e.to_string()),
                stdout_tail: None,
                stderr_tail: None,
            },
        };

        self.run_repo
            .close(
                run_id,
                RunClose {
                    status: result.status,
                    finished_at,
                    duration_ms: result.duration_ms,
                    exit_code: result.exit_code,
                    tokens: result.tokens,
                    result_meta: result.result_meta.clone(),
                    error: result.error.clone(),
                    stdout_tail: result.stdout_tail.clone(),
                    stderr_tail: result.stderr_tail.clone(),
                },
            )
            .await?;

        self.dispatch_notification(job, &result).await;

        Ok(result)
    }

    async fn dispatch_notification(&self, job: &Job, result: &crate::port::ExecutionResult) {
        if result.status == RunStatus::Ok {
            if let Some(channel) = &job.on_success_channel {
                if let Err(e) = self
                    .notifier
                    .notify_success(&job.name, result.duration_ms, channel)
                    .await
                {
                    warn!(job_id = %job.id, error = %e, "success notification failed");
                }
            }
        } else if let Some(channel) = &job.on_failure_channel {
            let error = result.error.clone().unwrap_or_default();
            if let Err(e) = self
                .notifier
                .notify_failure(&job.name, result.duration_ms, &error, channel)
                .await
            {
                warn!(job_id = %job.id, error = %e, "failure notification failed");
            }
        }
    }

    /// §4.7 stop(): poll until `running` drains or `shutdown_grace_ms` elapses.
    pub async fn wait_for_drain(&self, shutdown_grace_ms: u64) {
        let deadline = Instant::now() + std::time::Duration::from_millis(shutdown_grace_ms);
        loop {
            if self.running_count() == 0 {
                return;
            }
            if Instant::now() >= deadline {
                warn!(
                    remaining = self.running_count(),
                    "shutdown grace period elapsed with runs still in flight"
                );
                return;
            }
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Job;
    use crate::port::job_store::mocks::InMemoryJobStore;
    use crate::port::notifier::mocks::RecordingNotifier;
    use crate::port::task_executor::mocks::MockTaskExecutor;
    use crate::port::time_provider::SystemTimeProvider;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct FakeRunRepo {
        next_id: StdMutex<i64>,
        runs: StdMutex<HashMap<i64, Run>>,
    }

    impl Default for FakeRunRepo {
        fn default() -> Self {
            Self {
                next_id: StdMutex::new(1),
                runs: StdMutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl RunRepository for FakeRunRepo {
        async fn open(&self, run: &Run) -> Result<i64> {
            let mut next = self.next_id.lock().unwrap();
            let id = *next;
            *next += 1;
            let mut run = run.clone();
            run.id = id;
            self.runs.lock().unwrap().insert(id, run);
            Ok(id)
        }

        async fn close(&self, run_id: i64, close: RunClose) -> Result<()> {
            let mut runs = self.runs.lock().unwrap();
            if let Some(run) = runs.get_mut(&run_id) {
                run.status = close.status;
                run.finished_at = Some(close.finished_at);
                run.error = close.error;
            }
            Ok(())
        }

        async fn find_by_id(&self, run_id: i64) -> Result<Option<Run>> {
            Ok(self.runs.lock().unwrap().get(&run_id).cloned())
        }

        async fn list_for_job(&self, _job_id: &str, _limit: i64) -> Result<Vec<Run>> {
            Ok(vec![])
        }

        async fn list_orphaned(&self) -> Result<Vec<Run>> {
            Ok(vec![])
        }

        async fn delete_older_than(&self, _cutoff_millis: i64) -> Result<u64> {
            Ok(0)
        }

        async fn count_since(&self, _status: RunStatus, _since_millis: i64) -> Result<i64> {
            Ok(0)
        }
    }

    fn make_controller(
        max_concurrency: usize,
    ) -> (Arc<InMemoryJobStore>, Arc<FakeRunRepo>, Arc<RecordingNotifier>, RunController) {
        let job_store = Arc::new(InMemoryJobStore::new());
        let run_repo = Arc::new(FakeRunRepo::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let controller = RunController::new(
            job_store.clone(),
            run_repo.clone(),
            Arc::new(MockTaskExecutor::new_success()),
            Arc::new(MockTaskExecutor::new_success()),
            notifier.clone(),
            Arc::new(SystemTimeProvider),
            max_concurrency,
        );
        (job_store, run_repo, notifier, controller)
    }

    #[tokio::test]
    async fn manual_trigger_runs_job_and_notifies_success() {
        let (job_store, _run_repo, notifier, controller) = make_controller(4);
        let mut job = Job::new("j1", "job one", "* * * * *", "echo hi", JobType::Script, 0);
        job.on_success_channel = Some("ops".to_string());
        job_store.seed(job);

        let result = controller.trigger_job("j1").await.unwrap();
        assert_eq!(result.status, RunStatus::Ok);
        assert_eq!(notifier.successes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn manual_trigger_on_unknown_job_is_not_found() {
        let (_job_store, _run_repo, _notifier, controller) = make_controller(4);
        let err = controller.trigger_job("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn backpressure_rejects_when_concurrency_cap_hit() {
        let (job_store, _run_repo, _notifier, controller) = make_controller(0);
        let job = Job::new("j1", "job one", "* * * * *", "echo hi", JobType::Script, 0);
        job_store.seed(job);

        let err = controller.trigger_job("j1").await.unwrap_err();
        assert!(matches!(err, AppError::Backpressure(_)));
    }
}
