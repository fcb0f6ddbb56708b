// Maintenance scheduler (§4.8)
// Runs the three retention sweeps immediately on start and every
// `interval_ms` thereafter.

use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    interval_ms: u64,
}

impl MaintenanceScheduler {
    pub fn new(maintenance: Arc<dyn Maintenance>, config: MaintenanceConfig, interval_ms: u64) -> Self {
        Self {
            maintenance,
            config,
            interval_ms,
        }
    }

    /// Background loop: run once immediately, then on every tick (§4.8).
    pub async fn run(self) {
        info!(interval_ms = self.interval_ms, "maintenance scheduler started");

        self.run_now_logged().await;

        let mut tick = interval(Duration::from_millis(self.interval_ms));
        tick.tick().await; // first tick fires immediately; skip it, we already ran above

        loop {
            tick.tick().await;
            self.run_now_logged().await;
        }
    }

    async fn run_now_logged(&self) {
        match self.maintenance.run_full_maintenance(&self.config).await {
            Ok(stats) => {
                info!(
                    runs_deleted = stats.runs_deleted,
                    state_rows_deleted = stats.state_rows_deleted,
                    queue_items_deleted = stats.queue_items_deleted,
                    "maintenance sweep completed"
                );
            }
            Err(e) => {
                error!(error = ?e, "maintenance sweep failed");
            }
        }
    }

    pub async fn run_now(&self) -> Result<()> {
        let stats = self.maintenance.run_full_maintenance(&self.config).await?;
        info!(
            runs_deleted = stats.runs_deleted,
            state_rows_deleted = stats.state_rows_deleted,
            queue_items_deleted = stats.queue_items_deleted,
            "manual maintenance completed"
        );
        Ok(())
    }
}
