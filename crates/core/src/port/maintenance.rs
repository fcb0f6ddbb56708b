// Maintenance Port (§4.8)

use crate::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct MaintenanceStats {
    pub runs_deleted: u64,
    pub state_rows_deleted: u64,
    pub queue_items_deleted: u64,
}

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub run_retention_days: i64,
    pub default_queue_retention_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            run_retention_days: 30,
            default_queue_retention_days: 7,
        }
    }
}

/// The three retention sweeps (§4.8): run retention, state expiry, queue retention.
#[async_trait]
pub trait Maintenance: Send + Sync {
    async fn gc_runs(&self, retention_days: i64) -> Result<u64>;
    async fn gc_expired_state(&self) -> Result<u64>;
    async fn gc_queue_items(&self) -> Result<u64>;

    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceStats> {
        let runs_deleted = self.gc_runs(config.run_retention_days).await?;
        let state_rows_deleted = self.gc_expired_state().await?;
        let queue_items_deleted = self.gc_queue_items().await?;

        if runs_deleted > 0 || state_rows_deleted > 0 || queue_items_deleted > 0 {
            tracing::info!(
                runs_deleted,
                state_rows_deleted,
                queue_items_deleted,
                "maintenance sweep completed"
            );
        }

        Ok(MaintenanceStats {
            runs_deleted,
            state_rows_deleted,
            queue_items_deleted,
        })
    }
}
