// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid run transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid overlap policy: {0}")]
    InvalidOverlapPolicy(String),

    #[error("invalid job type: {0}")]
    InvalidJobType(String),

    #[error("invalid cron schedule: {0}")]
    InvalidSchedule(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
