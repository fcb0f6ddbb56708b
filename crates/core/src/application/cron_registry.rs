// Cron registry (§4.6)
//
// Keeps an in-memory view of which job ids are registered with the scheduler
// backend and under which schedule token, and reconciles that view against
// the store on demand and on a timer. The registry never reaches into the
// run controller's internals — it is handed a callback at construction
// (dependency inversion, §9 "cycles / shared references").

use crate::domain::Job;
use crate::port::{CronSchedulerBackend, FireCallback, JobStore};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct ReconcileReport {
    pub total_enabled: usize,
    pub failed_ids: Vec<String>,
}

struct RegistryState {
    /// job_id -> schedule token last registered.
    registered: HashMap<String, String>,
    failed: HashSet<String>,
}

pub struct CronRegistry {
    job_store: Arc<dyn JobStore>,
    backend: Arc<dyn CronSchedulerBackend>,
    on_fire: Arc<dyn Fn(String) -> FireCallback + Send + Sync>,
    state: Mutex<RegistryState>,
}

impl CronRegistry {
    /// `on_fire` builds the callback invoked by the backend when a job id's timer
    /// fires; the registry itself never decides what a fire does (§4.6, §4.7).
    pub fn new(
        job_store: Arc<dyn JobStore>,
        backend: Arc<dyn CronSchedulerBackend>,
        on_fire: Arc<dyn Fn(String) -> FireCallback + Send + Sync>,
    ) -> Self {
        Self {
            job_store,
            backend,
            on_fire,
            state: Mutex::new(RegistryState {
                registered: HashMap::new(),
                failed: HashSet::new(),
            }),
        }
    }

    pub fn failed_registrations(&self) -> Vec<String> {
        self.state.lock().unwrap().failed.iter().cloned().collect()
    }

    /// §4.6 reconcile(): load enabled jobs, drop stale registrations, (re)register
    /// changed or missing ones.
    pub async fn reconcile(&self) -> crate::error::Result<ReconcileReport> {
        let enabled = self.job_store.list_enabled().await?;
        let live_ids: HashSet<String> = enabled.iter().map(|j| j.id.clone()).collect();

        let stale: Vec<String> = {
            let state = self.state.lock().unwrap();
            state
                .registered
                .keys()
                .filter(|id| !live_ids.contains(*id))
                .cloned()
                .collect()
        };
        for id in stale {
            self.backend.unregister(&id).await?;
            self.state.lock().unwrap().registered.remove(&id);
        }

        let mut failed_ids = Vec::new();
        for job in &enabled {
            self.reconcile_one(job, &mut failed_ids).await;
        }

        {
            let mut state = self.state.lock().unwrap();
            state.failed = failed_ids.iter().cloned().collect();
        }

        Ok(ReconcileReport {
            total_enabled: enabled.len(),
            failed_ids,
        })
    }

    async fn reconcile_one(&self, job: &Job, failed_ids: &mut Vec<String>) {
        let token = job.normalized_schedule();
        let needs_register = {
            let state = self.state.lock().unwrap();
            match state.registered.get(&job.id) {
                Some(existing) => existing != &token,
                None => true,
            }
        };
        if !needs_register {
            return;
        }

        if let Err(e) = self.backend.validate(&token) {
            error!(job_id = %job.id, error = %e, "invalid cron schedule, skipping registration");
            failed_ids.push(job.id.clone());
            return;
        }

        let job_id = job.id.clone();
        let callback = (self.on_fire)(job_id.clone());

        match self.backend.register(&job.id, &token, callback).await {
            Ok(()) => {
                self.state
                    .lock()
                    .unwrap()
                    .registered
                    .insert(job.id.clone(), token);
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "failed to register cron job");
                failed_ids.push(job.id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobType;
    use crate::port::cron_scheduler::mocks::InMemoryCronBackend;
    use crate::port::job_store::mocks::InMemoryJobStore;

    fn noop_callback(_id: String) -> FireCallback {
        Arc::new(|| Box::pin(async {}))
    }

    #[tokio::test]
    async fn registers_enabled_jobs_and_reports_count() {
        let store = Arc::new(InMemoryJobStore::new());
        store.seed(Job::new("j1", "job one", "*/5 * * * *", "echo hi", JobType::Script, 0));
        let backend = Arc::new(InMemoryCronBackend::default());
        let registry = CronRegistry::new(store, backend.clone(), Arc::new(noop_callback));

        let report = registry.reconcile().await.unwrap();
        assert_eq!(report.total_enabled, 1);
        assert!(report.failed_ids.is_empty());
        assert!(backend.is_registered("j1").await);
    }

    #[tokio::test]
    async fn unregisters_jobs_no_longer_enabled() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut job = Job::new("j1", "job one", "*/5 * * * *", "echo hi", JobType::Script, 0);
        store.seed(job.clone());
        let backend = Arc::new(InMemoryCronBackend::default());
        let registry = CronRegistry::new(store.clone(), backend.clone(), Arc::new(noop_callback));
        registry.reconcile().await.unwrap();
        assert!(backend.is_registered("j1").await);

        job.enabled = false;
        store.seed(job);
        registry.reconcile().await.unwrap();
        assert!(!backend.is_registered("j1").await);
    }
}
