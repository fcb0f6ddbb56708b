// Task Executor Port (§4.4, §4.5)
// Abstraction for executing a job, whether as a child process or a remote session.

use crate::domain::{Job, RunStatus};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Result of one execution attempt, already in the shape a Run record wants (§3 Run).
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub status: RunStatus,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
    pub tokens: Option<i64>,
    pub result_meta: Option<String>,
    pub error: Option<String>,
    pub stdout_tail: Option<String>,
    pub stderr_tail: Option<String>,
}

/// Execution errors (§7 ExecutionFailed / Timeout)
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("process timed out after {0}ms")]
    Timeout(i64),

    #[error("invalid script configuration: {0}")]
    InvalidScript(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("gateway error: {0}")]
    GatewayError(String),
}

/// Runs a job to completion and reports what happened.
///
/// Implementations: a script executor (child process, §4.4) and a session
/// executor (remote gateway delegate, §4.5). The run controller (§4.7)
/// dispatches to the right one by `job.job_type`.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, job: &Job, run_id: i64) -> Result<ExecutionResult, ExecutionError>;
}

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        Success,
        Fail(String),
        Panic(String),
        Timeout(i64),
    }

    pub struct MockTaskExecutor {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockTaskExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl TaskExecutor for MockTaskExecutor {
        async fn execute(&self, _job: &Job, _run_id: i64) -> Result<ExecutionResult, ExecutionError> {
            *self.call_count.lock().unwrap() += 1;
            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Success => Ok(ExecutionResult {
                    status: RunStatus::Ok,
                    duration_ms: 10,
                    exit_code: Some(0),
                    tokens: None,
                    result_meta: None,
                    error: None,
                    stdout_tail: Some("mock output".to_string()),
                    stderr_tail: None,
                }),
                MockBehavior::Fail(msg) => Err(ExecutionError::SpawnFailed(msg)),
                MockBehavior::Panic(msg) => panic!("{}", msg),
                MockBehavior::Timeout(ms) => Err(ExecutionError::Timeout(ms)),
            }
        }
    }
}
