// Queue domain model (§3 Queue definition / Queue item, §4.3)

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type QueueId = String;
pub type QueueItemId = i64;

/// Which item statuses participate in duplicate detection (§3 I4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    Pending,
    All,
}

impl DedupScope {
    /// Item statuses considered "still counts as a duplicate" under this scope.
    pub fn matching_statuses(&self) -> &'static [QueueItemStatus] {
        match self {
            DedupScope::Pending => &[QueueItemStatus::Pending, QueueItemStatus::Processing],
            DedupScope::All => &[
                QueueItemStatus::Pending,
                QueueItemStatus::Processing,
                QueueItemStatus::Done,
            ],
        }
    }
}

impl FromStr for DedupScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DedupScope::Pending),
            "all" => Ok(DedupScope::All),
            other => Err(DomainError::ValidationError(format!(
                "unknown dedup scope: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for DedupScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupScope::Pending => write!(f, "pending"),
            DedupScope::All => write!(f, "all"),
        }
    }
}

/// The durable work queue's own defaults when an item names an undeclared queue (§3 I3).
pub const DEFAULT_MAX_ATTEMPTS: i32 = 1;
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// A named queue's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDefinition {
    pub id: QueueId,
    pub name: String,
    pub dedup_expr: Option<String>,
    pub dedup_scope: DedupScope,
    pub max_attempts: i32,
    pub retention_days: i64,
}

impl QueueDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dedup_expr: None,
            dedup_scope: DedupScope::Pending,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl FromStr for QueueItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueItemStatus::Pending),
            "processing" => Ok(QueueItemStatus::Processing),
            "done" => Ok(QueueItemStatus::Done),
            "failed" => Ok(QueueItemStatus::Failed),
            other => Err(DomainError::ValidationError(format!(
                "unknown queue item status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for QueueItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueueItemStatus::Pending => "pending",
            QueueItemStatus::Processing => "processing",
            QueueItemStatus::Done => "done",
            QueueItemStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A unit of durable work inside a queue (§3 Queue item).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub queue_id: QueueId,
    pub payload: serde_json::Value,
    pub status: QueueItemStatus,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub dedup_key: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
    pub claimed_at: Option<i64>,
    pub finished_at: Option<i64>,
}

/// Sentinel returned by `enqueue` when a duplicate was detected (§4.3).
pub const ENQUEUE_DEDUPED: QueueItemId = -1;

/// Evaluate a tiny `$.field.nested` / `$.field[0]` path expression against a JSON
/// payload, returning the first matched value as a string (§4.3 step 2).
pub fn evaluate_dedup_path(payload: &serde_json::Value, expr: &str) -> Option<String> {
    let expr = expr.strip_prefix("$.").unwrap_or(expr.strip_prefix('$')?);
    let mut current = payload;
    for segment in expr.split('.') {
        if segment.is_empty() {
            continue;
        }
        let (field, index) = match segment.split_once('[') {
            Some((f, rest)) => {
                let idx_str = rest.trim_end_matches(']');
                let idx: usize = idx_str.parse().ok()?;
                (f, Some(idx))
            }
            None => (segment, None),
        };
        current = if field.is_empty() {
            current
        } else {
            current.get(field)?
        };
        if let Some(idx) = index {
            current = current.get(idx)?;
        }
    }
    match current {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
