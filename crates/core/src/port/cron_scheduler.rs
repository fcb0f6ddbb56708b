// Cron Scheduler Backend Port (§4.6)
// The cron registry (application layer) reconciles desired state against the store;
// this port is the thin timer-registration primitive an infra crate provides
// (grounded on tokio-cron-scheduler) so the registry stays infra-free.

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

pub type FireCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[async_trait]
pub trait CronSchedulerBackend: Send + Sync {
    /// Register a timer for `job_id` on `cron_expr` (5 or 6 field). Replaces any
    /// existing registration for the same id.
    async fn register(&self, job_id: &str, cron_expr: &str, callback: FireCallback) -> Result<()>;

    async fn unregister(&self, job_id: &str) -> Result<()>;

    async fn is_registered(&self, job_id: &str) -> bool;

    /// Validate a schedule expression without registering it (§4.6, §6 Cron syntax).
    fn validate(&self, cron_expr: &str) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryCronBackend {
        registered: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl CronSchedulerBackend for InMemoryCronBackend {
        async fn register(
            &self,
            job_id: &str,
            _cron_expr: &str,
            _callback: FireCallback,
        ) -> Result<()> {
            self.registered.lock().unwrap().insert(job_id.to_string());
            Ok(())
        }

        async fn unregister(&self, job_id: &str) -> Result<()> {
            self.registered.lock().unwrap().remove(job_id);
            Ok(())
        }

        async fn is_registered(&self, job_id: &str) -> bool {
            self.registered.lock().unwrap().contains(job_id)
        }

        fn validate(&self, cron_expr: &str) -> Result<()> {
            if cron_expr.trim().is_empty() {
                return Err(crate::error::AppError::Config("empty schedule".to_string()));
            }
            Ok(())
        }
    }
}
