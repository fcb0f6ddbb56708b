// Run domain model (§3 Run, §4.7)

use super::error::DomainError;
use super::job::JobId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type RunId = i64;

/// Terminal or transient status of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Ok,
    Error,
    Timeout,
    Skipped,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Pending | RunStatus::Running)
    }
}

impl FromStr for RunStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "ok" => Ok(RunStatus::Ok),
            "error" => Ok(RunStatus::Error),
            "timeout" => Ok(RunStatus::Timeout),
            "skipped" => Ok(RunStatus::Skipped),
            other => Err(DomainError::ValidationError(format!(
                "unknown run status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Ok => "ok",
            RunStatus::Error => "error",
            RunStatus::Timeout => "timeout",
            RunStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// What caused this run to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Schedule,
    Manual,
    Retry,
}

impl std::fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunTrigger::Schedule => "schedule",
            RunTrigger::Manual => "manual",
            RunTrigger::Retry => "retry",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RunTrigger {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(RunTrigger::Schedule),
            "manual" => Ok(RunTrigger::Manual),
            "retry" => Ok(RunTrigger::Retry),
            other => Err(DomainError::ValidationError(format!(
                "unknown run trigger: {other}"
            ))),
        }
    }
}

/// One execution attempt of a job (§3 Run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub job_id: JobId,
    pub status: RunStatus,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub duration_ms: Option<i64>,
    pub exit_code: Option<i32>,
    pub tokens: Option<i64>,
    pub result_meta: Option<String>,
    pub error: Option<String>,
    pub stdout_tail: Option<String>,
    pub stderr_tail: Option<String>,
    pub trigger: RunTrigger,
}

impl Run {
    pub fn open(job_id: impl Into<String>, trigger: RunTrigger, now_millis: i64) -> Self {
        Self {
            id: 0,
            job_id: job_id.into(),
            status: RunStatus::Running,
            started_at: now_millis,
            finished_at: None,
            duration_ms: None,
            exit_code: None,
            tokens: None,
            result_meta: None,
            error: None,
            stdout_tail: None,
            stderr_tail: None,
            trigger,
        }
    }
}
