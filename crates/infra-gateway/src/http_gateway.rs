// HTTP-based session gateway client (§4.10).
//
// Speaks JSON over HTTP to `gateway.url`, with bearer auth sourced from
// `gateway.tokenPath`'s file contents when present. Applies its own bounded
// per-call timeout, independent of the session's overall `timeoutMs`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use taskrunner_core::port::gateway_client::{
    GatewayClient, GatewayError, SessionInfo, SpawnSessionOptions, SpawnedSession,
};
use tracing::warn;

const GATEWAY_CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGatewayClient {
    pub fn new(base_url: impl Into<String>, token_path: Option<&str>) -> Self {
        let token = token_path.and_then(|path| match std::fs::read_to_string(path) {
            Ok(contents) => Some(contents.trim().to_string()),
            Err(e) => {
                warn!(path, error = %e, "failed to read gateway token file, continuing unauthenticated");
                None
            }
        });

        let client = reqwest::Client::builder()
            .timeout(GATEWAY_CALL_TIMEOUT)
            .build()
            .expect("reqwest client build");

        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[derive(serde::Serialize)]
struct SpawnRequest<'a> {
    prompt: &'a str,
    label: &'a str,
    thinking: &'a str,
    #[serde(rename = "runTimeoutSeconds")]
    run_timeout_seconds: i64,
}

#[derive(Deserialize)]
struct SpawnResponseDto {
    #[serde(rename = "sessionKey")]
    session_key: String,
    #[serde(rename = "runId")]
    run_id: String,
}

#[derive(Deserialize)]
struct CompleteResponseDto {
    complete: bool,
}

#[derive(Deserialize)]
struct SessionInfoDto {
    #[serde(rename = "totalTokens")]
    total_tokens: Option<i64>,
    model: Option<String>,
    #[serde(rename = "transcriptPath")]
    transcript_path: Option<String>,
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn spawn_session(
        &self,
        prompt: &str,
        opts: SpawnSessionOptions,
    ) -> Result<SpawnedSession, GatewayError> {
        let body = SpawnRequest {
            prompt,
            label: &opts.label,
            thinking: &opts.thinking,
            run_timeout_seconds: opts.run_timeout_seconds,
        };

        let response = self
            .request(reqwest::Method::POST, "/sessions")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::RequestFailed(format!(
                "spawn_session returned {}",
                response.status()
            )));
        }

        let dto: SpawnResponseDto = response
            .json()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        Ok(SpawnedSession {
            session_key: dto.session_key,
            run_id: dto.run_id,
        })
    }

    async fn is_session_complete(&self, session_key: &str) -> Result<bool, GatewayError> {
        let path = format!("/sessions/{session_key}/complete");
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(session_key.to_string()));
        }
        if !response.status().is_success() {
            return Err(GatewayError::RequestFailed(format!(
                "is_session_complete returned {}",
                response.status()
            )));
        }

        let dto: CompleteResponseDto = response
            .json()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        Ok(dto.complete)
    }

    async fn get_session_info(&self, session_key: &str) -> Result<Option<SessionInfo>, GatewayError> {
        let path = format!("/sessions/{session_key}");
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::RequestFailed(format!(
                "get_session_info returned {}",
                response.status()
            )));
        }

        let dto: SessionInfoDto = response
            .json()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        Ok(Some(SessionInfo {
            total_tokens: dto.total_tokens,
            model: dto.model,
            transcript_path: dto.transcript_path,
        }))
    }
}
