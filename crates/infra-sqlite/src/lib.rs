// SQLite adapter crate: implements JobStore, RunRepository, StateStore,
// QueueStore, and Maintenance against a single `sqlx` SQLite pool (§4.1 Store).

mod connection;
mod error_map;
pub mod job_store;
mod maintenance_impl;
mod migration;
pub mod queue_store;
pub mod run_repository;
mod state_store;

pub use connection::create_pool;
pub use job_store::SqliteJobStore;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;
pub use run_repository::SqliteRunRepository;
pub use state_store::SqliteStateStore;

// sqlx::Error is mapped into AppError at this crate's boundary (see error_map)
// rather than via `impl From<sqlx::Error> for AppError` in core, which would
// violate the hexagonal dependency direction (ADR-001).
