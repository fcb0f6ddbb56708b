// Cron scheduler backend (§4.6) built on `tokio-cron-scheduler`.
//
// The application-layer `CronRegistry` owns reconciliation; this adapter is
// the thin per-job timer primitive it calls into, keyed by job id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use taskrunner_core::error::{AppError, Result};
use taskrunner_core::port::cron_scheduler::{CronSchedulerBackend, FireCallback};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

pub struct TokioCronBackend {
    scheduler: JobScheduler,
    handles: Mutex<HashMap<String, Uuid>>,
}

impl TokioCronBackend {
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Internal(format!("failed to start cron scheduler: {e}")))?;

        scheduler
            .start()
            .await
            .map_err(|e| AppError::Internal(format!("failed to start cron scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            handles: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl CronSchedulerBackend for TokioCronBackend {
    async fn register(&self, job_id: &str, cron_expr: &str, callback: FireCallback) -> Result<()> {
        self.unregister(job_id).await?;

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let callback = callback.clone();
            Box::pin(async move {
                callback().await;
            })
        })
        .map_err(|e| AppError::Config(format!("invalid schedule '{cron_expr}': {e}")))?;

        let uuid = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Internal(format!("failed to register job {job_id}: {e}")))?;

        self.handles.lock().unwrap().insert(job_id.to_string(), uuid);
        Ok(())
    }

    async fn unregister(&self, job_id: &str) -> Result<()> {
        let uuid = self.handles.lock().unwrap().remove(job_id);
        if let Some(uuid) = uuid {
            self.scheduler
                .remove(&uuid)
                .await
                .map_err(|e| AppError::Internal(format!("failed to unregister job {job_id}: {e}")))?;
        }
        Ok(())
    }

    async fn is_registered(&self, job_id: &str) -> bool {
        self.handles.lock().unwrap().contains_key(job_id)
    }

    fn validate(&self, cron_expr: &str) -> Result<()> {
        if cron_expr.trim().is_empty() {
            return Err(AppError::Config("empty schedule".to_string()));
        }
        cron::Schedule::from_str(&normalize_for_validation(cron_expr))
            .map(|_| ())
            .map_err(|e| AppError::Config(format!("invalid schedule '{cron_expr}': {e}")))
    }
}

fn normalize_for_validation(expr: &str) -> String {
    taskrunner_core::domain::job::normalize_cron(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validates_well_formed_schedule() {
        let backend = TokioCronBackend::new().await.unwrap();
        assert!(backend.validate("*/5 * * * *").is_ok());
    }

    #[tokio::test]
    async fn rejects_empty_schedule() {
        let backend = TokioCronBackend::new().await.unwrap();
        assert!(backend.validate("").is_err());
    }

    #[tokio::test]
    async fn rejects_malformed_schedule() {
        let backend = TokioCronBackend::new().await.unwrap();
        assert!(backend.validate("not a cron expr").is_err());
    }
}
