// Port Layer - Interfaces for external dependencies

pub mod cron_scheduler;
pub mod gateway_client;
pub mod id_provider;
pub mod job_store;
pub mod maintenance;
pub mod notifier;
pub mod queue_store;
pub mod run_repository;
pub mod state_store;
pub mod task_executor;
pub mod time_provider;

pub use cron_scheduler::{CronSchedulerBackend, FireCallback};
pub use gateway_client::{GatewayClient, GatewayError, SessionInfo, SpawnSessionOptions, SpawnedSession};
pub use id_provider::IdProvider;
pub use job_store::JobStore;
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceStats};
pub use notifier::{format_failure, format_success, NotifyError, Notifier};
pub use queue_store::QueueStore;
pub use run_repository::{RunClose, RunRepository};
pub use state_store::{ItemOrder, StateStore};
pub use task_executor::{ExecutionError, ExecutionResult, TaskExecutor};
pub use time_provider::{SystemTimeProvider, TimeProvider};
