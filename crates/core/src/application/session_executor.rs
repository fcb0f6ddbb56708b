// Session-variant executor (§4.5)
//
// Pure orchestration over the `GatewayClient` port — no direct I/O, so this
// stays in the core crate rather than an infra adapter (ADR-001).

use crate::application::constants::{
    DEFAULT_SESSION_POLL_INTERVAL_MS, DEFAULT_SESSION_TIMEOUT_MS, SESSION_POLL_BACKOFF_FACTOR,
    SESSION_POLL_INTERVAL_CAP_MS,
};
use crate::domain::{Job, RunStatus};
use crate::port::task_executor::{ExecutionError, ExecutionResult, TaskExecutor};
use crate::port::{GatewayClient, SpawnSessionOptions};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

pub struct SessionExecutor {
    gateway: Arc<dyn GatewayClient>,
}

impl SessionExecutor {
    pub fn new(gateway: Arc<dyn GatewayClient>) -> Self {
        Self { gateway }
    }
}

/// Resolve the prompt text for a session job from its `script` field (§4.5).
pub fn resolve_prompt(script: &str) -> Result<String, ExecutionError> {
    let ext = Path::new(script)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("md") | Some("txt") => std::fs::read_to_string(script)
            .map_err(|e| ExecutionError::IoError(format!("failed to read prompt file: {e}"))),
        Some("js") | Some("mjs") | Some("cjs") | Some("ps1") | Some("cmd") | Some("bat") => {
            Err(ExecutionError::InvalidScript(format!(
                "script extension {ext:?} names an executable job, not a session prompt"
            )))
        }
        _ => Ok(script.to_string()),
    }
}

#[async_trait]
impl TaskExecutor for SessionExecutor {
    async fn execute(&self, job: &Job, _run_id: i64) -> Result<ExecutionResult, ExecutionError> {
        let prompt = resolve_prompt(&job.script)?;
        let timeout_ms = job.timeout_ms.unwrap_or(DEFAULT_SESSION_TIMEOUT_MS);
        let start = Instant::now();

        let spawned = self
            .gateway
            .spawn_session(
                &prompt,
                SpawnSessionOptions {
                    label: job.id.clone(),
                    thinking: "low".to_string(),
                    run_timeout_seconds: timeout_ms / 1000,
                },
            )
            .await
            .map_err(|e| ExecutionError::GatewayError(e.to_string()))?;

        let mut interval_ms = DEFAULT_SESSION_POLL_INTERVAL_MS;
        loop {
            let elapsed_ms = start.elapsed().as_millis() as i64;
            if elapsed_ms > timeout_ms {
                return Ok(ExecutionResult {
                    status: RunStatus::Timeout,
                    duration_ms: elapsed_ms,
                    exit_code: None,
                    tokens: None,
                    result_meta: Some(spawned.session_key.clone()),
                    error: Some(format!("session timed out after {timeout_ms}ms")),
                    stdout_tail: None,
                    stderr_tail: None,
                });
            }

            tokio::time::sleep(Duration::from_millis(interval_ms)).await;

            let complete = self
                .gateway
                .is_session_complete(&spawned.session_key)
                .await
                .map_err(|e| ExecutionError::GatewayError(e.to_string()))?;

            if complete {
                break;
            }

            interval_ms = ((interval_ms as f64) * SESSION_POLL_BACKOFF_FACTOR) as u64;
            interval_ms = interval_ms.min(SESSION_POLL_INTERVAL_CAP_MS);
        }

        let duration_ms = start.elapsed().as_millis() as i64;
        let info_result = self
            .gateway
            .get_session_info(&spawned.session_key)
            .await
            .map_err(|e| ExecutionError::GatewayError(e.to_string()))?;

        info!(job_id = %job.id, session_key = %spawned.session_key, "session completed");

        Ok(ExecutionResult {
            status: RunStatus::Ok,
            duration_ms,
            exit_code: None,
            tokens: info_result.as_ref().and_then(|i| i.total_tokens),
            result_meta: Some(spawned.session_key.clone()),
            error: None,
            stdout_tail: Some(format!("Session completed: {}", spawned.session_key)),
            stderr_tail: None,
        })
    }
}
