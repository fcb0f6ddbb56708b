// Webhook-based notification dispatch (§4.9, §4.9.1).
//
// `channel` is either a bare URL or a lookup key into the `channel -> url`
// mapping stored one-per-line in `notifications.slackTokenPath`. All faults
// (bad URL, non-2xx, missing/unreadable token file) are caught and logged as
// a single warning, never propagated (NotificationError, §7).

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use taskrunner_core::port::notifier::{format_failure, format_success, NotifyError, Notifier};
use tracing::warn;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookNotifier {
    client: reqwest::Client,
    channel_map_path: Option<String>,
}

impl WebhookNotifier {
    pub fn new(channel_map_path: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .expect("reqwest client build");

        Self { client, channel_map_path }
    }

    fn resolve_url(&self, channel: &str) -> Option<String> {
        if channel.starts_with("http://") || channel.starts_with("https://") {
            return Some(channel.to_string());
        }

        let path = self.channel_map_path.as_ref()?;
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path, error = %e, "failed to read notification channel map");
                return None;
            }
        };

        contents.lines().find_map(|line| {
            let (name, url) = line.split_once(char::is_whitespace)?;
            (name.trim() == channel).then(|| url.trim().to_string())
        })
    }

    async fn post(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        let Some(url) = self.resolve_url(channel) else {
            warn!(channel, "no resolvable webhook URL for notification channel, dropping message");
            return Ok(());
        };

        let response = self
            .client
            .post(&url)
            .json(&json!({ "text": message }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                warn!(channel, status = %resp.status(), "notification webhook returned non-2xx");
                Ok(())
            }
            Err(e) => {
                warn!(channel, error = %e, "notification webhook request failed");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_success(&self, job_name: &str, duration_ms: i64, channel: &str) -> Result<(), NotifyError> {
        self.post(channel, &format_success(job_name, duration_ms)).await
    }

    async fn notify_failure(
        &self,
        job_name: &str,
        duration_ms: i64,
        error: &str,
        channel: &str,
    ) -> Result<(), NotifyError> {
        self.post(channel, &format_failure(job_name, duration_ms, error)).await
    }
}

/// Used when a job has no `on_success_channel`/`on_failure_channel` configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_success(&self, job_name: &str, _duration_ms: i64, _channel: &str) -> Result<(), NotifyError> {
        tracing::info!(job_name, "no notification channel configured, skipping");
        Ok(())
    }

    async fn notify_failure(
        &self,
        job_name: &str,
        _duration_ms: i64,
        _error: &str,
        _channel: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(job_name, "no notification channel configured, skipping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bare_url_directly() {
        let notifier = WebhookNotifier::new(None);
        assert_eq!(
            notifier.resolve_url("https://hooks.example.com/abc"),
            Some("https://hooks.example.com/abc".to_string())
        );
    }

    #[test]
    fn resolves_named_channel_from_map_file() {
        let dir = std::env::temp_dir().join(format!("notif-map-test-{}", std::process::id()));
        std::fs::write(&dir, "ops https://hooks.example.com/ops\nalerts https://hooks.example.com/alerts\n").unwrap();

        let notifier = WebhookNotifier::new(Some(dir.to_str().unwrap().to_string()));
        assert_eq!(
            notifier.resolve_url("alerts"),
            Some("https://hooks.example.com/alerts".to_string())
        );
        assert_eq!(notifier.resolve_url("missing"), None);

        let _ = std::fs::remove_file(&dir);
    }

    #[tokio::test]
    async fn notify_with_unresolvable_channel_does_not_error() {
        let notifier = WebhookNotifier::new(None);
        let result = notifier.notify_success("job", 1000, "unresolvable-channel").await;
        assert!(result.is_ok());
    }
}
