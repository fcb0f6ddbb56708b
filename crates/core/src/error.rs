// Central error type for the application (§7)

use thiserror::Error;

/// Application-level error type. One variant per taxonomy entry in §7.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// ConfigError (§7): invalid schedule, overlap policy, job type, TTL, config document.
    #[error("config error: {0}")]
    Config(String),

    /// NotFound (§7): unknown job id or queue item.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backpressure (§7): concurrency cap reached.
    #[error("backpressure: {0}")]
    Backpressure(String),

    /// ExecutionFailed (§7): child process or session gateway error.
    #[error("execution error: {0}")]
    Execution(#[from] crate::port::ExecutionError),

    /// Timeout (§7): per-job wall-clock exceeded.
    #[error("timeout: {0}")]
    Timeout(String),

    /// IOError (§7): database, filesystem, or network fault in infrastructural work.
    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

// Infra crates cannot implement `From<sqlx::Error>`/`From<reqwest::Error>` here
// (orphan rules, and core must stay infra-free per ADR-001); they map their own
// errors into AppError::Database/Internal at the crate boundary instead.
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Database(err)
    }
}
