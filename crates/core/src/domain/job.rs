// Job domain model (§3, §4.6, §4.7)

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type JobId = String;

/// What the job's `script` field names and how it is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// `script` is a host-executable path; run as a child process (§4.4).
    Script,
    /// `script` is a prompt (inline or a file); delegated to a remote session (§4.5).
    Session,
}

impl FromStr for JobType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "script" => Ok(JobType::Script),
            "session" => Ok(JobType::Session),
            other => Err(DomainError::InvalidJobType(other.to_string())),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Script => write!(f, "script"),
            JobType::Session => write!(f, "session"),
        }
    }
}

/// What happens when a scheduled fire would start a job that is already running (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    Skip,
    /// Accepted in the schema; behaves identically to `Skip` at runtime (§9).
    Queue,
    Allow,
}

impl FromStr for OverlapPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(OverlapPolicy::Skip),
            "queue" => Ok(OverlapPolicy::Queue),
            "allow" => Ok(OverlapPolicy::Allow),
            other => Err(DomainError::InvalidOverlapPolicy(other.to_string())),
        }
    }
}

impl std::fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlapPolicy::Skip => write!(f, "skip"),
            OverlapPolicy::Queue => write!(f, "queue"),
            OverlapPolicy::Allow => write!(f, "allow"),
        }
    }
}

/// A persistent job declaration (§3 Job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub schedule: String,
    pub script: String,
    pub job_type: JobType,
    pub description: Option<String>,
    pub enabled: bool,
    pub timeout_ms: Option<i64>,
    pub overlap_policy: OverlapPolicy,
    pub on_failure_channel: Option<String>,
    pub on_success_channel: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        schedule: impl Into<String>,
        script: impl Into<String>,
        job_type: JobType,
        now_millis: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            schedule: schedule.into(),
            script: script.into(),
            job_type,
            description: None,
            enabled: true,
            timeout_ms: None,
            overlap_policy: OverlapPolicy::Skip,
            on_failure_channel: None,
            on_success_channel: None,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    /// Normalize a 5-field cron expression to 6 fields (seconds-first) for parsers
    /// that require the seconds slot (§4.6).
    pub fn normalized_schedule(&self) -> String {
        normalize_cron(&self.schedule)
    }
}

pub fn normalize_cron(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}
