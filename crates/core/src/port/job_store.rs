// Job Store Port (§4.1 Store, §3 Job)

use crate::domain::{Job, JobId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Job persistence. Job creation is out-of-band
/// (§6: no POST /jobs) — this port still exposes `insert` for seed data and tests.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &Job) -> Result<()>;
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;
    async fn list_all(&self) -> Result<Vec<Job>>;
    async fn list_enabled(&self) -> Result<Vec<Job>>;
    async fn set_enabled(&self, id: &JobId, enabled: bool, now_millis: i64) -> Result<bool>;
    async fn update_script(&self, id: &JobId, script: &str, now_millis: i64) -> Result<bool>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryJobStore {
        jobs: Mutex<HashMap<JobId, Job>>,
    }

    impl InMemoryJobStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, job: Job) {
            self.jobs.lock().unwrap().insert(job.id.clone(), job);
        }
    }

    #[async_trait]
    impl JobStore for InMemoryJobStore {
        async fn insert(&self, job: &Job) -> Result<()> {
            self.jobs.lock().unwrap().insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
            Ok(self.jobs.lock().unwrap().get(id).cloned())
        }

        async fn list_all(&self) -> Result<Vec<Job>> {
            Ok(self.jobs.lock().unwrap().values().cloned().collect())
        }

        async fn list_enabled(&self) -> Result<Vec<Job>> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|j| j.enabled)
                .cloned()
                .collect())
        }

        async fn set_enabled(&self, id: &JobId, enabled: bool, now_millis: i64) -> Result<bool> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.get_mut(id) {
                job.enabled = enabled;
                job.updated_at = now_millis;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn update_script(&self, id: &JobId, script: &str, now_millis: i64) -> Result<bool> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.get_mut(id) {
                job.script = script.to_string();
                job.updated_at = now_millis;
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }
}
