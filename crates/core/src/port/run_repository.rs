// Run Repository Port (§3 Run, §4.7, §4.8)

use crate::domain::{Run, RunId, RunStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Fields set when a run closes (§3 Run lifecycle: "updated exactly once to terminal status").
#[derive(Debug, Clone)]
pub struct RunClose {
    pub status: RunStatus,
    pub finished_at: i64,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
    pub tokens: Option<i64>,
    pub result_meta: Option<String>,
    pub error: Option<String>,
    pub stdout_tail: Option<String>,
    pub stderr_tail: Option<String>,
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Insert a run row with status=running and return its assigned id.
    async fn open(&self, run: &Run) -> Result<RunId>;

    /// Close a previously opened run (§3: updated exactly once to terminal status).
    async fn close(&self, run_id: RunId, close: RunClose) -> Result<()>;

    async fn find_by_id(&self, run_id: RunId) -> Result<Option<Run>>;

    /// Most recent runs for a job, newest first.
    async fn list_for_job(&self, job_id: &str, limit: i64) -> Result<Vec<Run>>;

    /// Runs still in a non-terminal status (used by crash recovery, §9.1).
    async fn list_orphaned(&self) -> Result<Vec<Run>>;

    /// Delete runs started before `cutoff_millis` (§4.8 run retention).
    async fn delete_older_than(&self, cutoff_millis: i64) -> Result<u64>;

    /// Count runs with the given status started on or after `since_millis` (§6 /stats).
    async fn count_since(&self, status: RunStatus, since_millis: i64) -> Result<i64>;
}
