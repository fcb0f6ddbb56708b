// Session Gateway Client Port (§4.5, §4.10)
// Consumed by the session-variant executor to delegate a job to a remote agent host.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct SpawnSessionOptions {
    pub label: String,
    pub thinking: String,
    pub run_timeout_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct SpawnedSession {
    pub session_key: String,
    pub run_id: String,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub total_tokens: Option<i64>,
    pub model: Option<String>,
    pub transcript_path: Option<String>,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    RequestFailed(String),

    #[error("session not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn spawn_session(
        &self,
        prompt: &str,
        opts: SpawnSessionOptions,
    ) -> Result<SpawnedSession, GatewayError>;

    async fn is_session_complete(&self, session_key: &str) -> Result<bool, GatewayError>;

    async fn get_session_info(
        &self,
        session_key: &str,
    ) -> Result<Option<SessionInfo>, GatewayError>;
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic gateway used by the core's own test suite (§4.10): completes
    /// after `complete_after_polls` calls to `is_session_complete`.
    pub struct MockGatewayClient {
        complete_after_polls: usize,
        polls: AtomicUsize,
        pub tokens: Option<i64>,
    }

    impl MockGatewayClient {
        pub fn new(complete_after_polls: usize, tokens: Option<i64>) -> Self {
            Self {
                complete_after_polls,
                polls: AtomicUsize::new(0),
                tokens,
            }
        }
    }

    #[async_trait]
    impl GatewayClient for MockGatewayClient {
        async fn spawn_session(
            &self,
            _prompt: &str,
            opts: SpawnSessionOptions,
        ) -> Result<SpawnedSession, GatewayError> {
            Ok(SpawnedSession {
                session_key: format!("mock-session-{}", opts.label),
                run_id: "mock-run".to_string(),
            })
        }

        async fn is_session_complete(&self, _session_key: &str) -> Result<bool, GatewayError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(n >= self.complete_after_polls)
        }

        async fn get_session_info(
            &self,
            session_key: &str,
        ) -> Result<Option<SessionInfo>, GatewayError> {
            Ok(Some(SessionInfo {
                total_tokens: self.tokens,
                model: Some("mock-model".to_string()),
                transcript_path: Some(format!("/tmp/{session_key}.json")),
            }))
        }
    }
}
