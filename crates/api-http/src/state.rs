use std::sync::Arc;
use std::time::Instant;
use taskrunner_core::application::{CronRegistry, RunController};
use taskrunner_core::port::{JobStore, RunRepository};

#[derive(Clone)]
pub struct AppState {
    pub job_store: Arc<dyn JobStore>,
    pub run_repo: Arc<dyn RunRepository>,
    pub run_controller: Arc<RunController>,
    pub cron_registry: Arc<CronRegistry>,
    pub started_at: Instant,
    pub max_concurrency: usize,
}
