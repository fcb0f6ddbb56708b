// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod cron_registry;
pub mod maintenance;
pub mod recovery;
pub mod run_controller;
pub mod session_executor;

pub use cron_registry::{CronRegistry, ReconcileReport};
pub use maintenance::MaintenanceScheduler;
pub use recovery::RecoveryService;
pub use run_controller::RunController;
pub use session_executor::{resolve_prompt, SessionExecutor};
