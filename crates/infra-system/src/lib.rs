// System adapter crate: script-variant TaskExecutor (§4.4) and the
// tokio-cron-scheduler-backed CronSchedulerBackend (§4.6).

pub mod cron_backend;
pub mod script_executor;

pub use cron_backend::TokioCronBackend;
pub use script_executor::ScriptExecutor;
