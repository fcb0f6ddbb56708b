// Notification Dispatch Port (§4.9)

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Caught and logged at every call site; never surfaces as a run failure (§7 NotificationError).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_success(
        &self,
        job_name: &str,
        duration_ms: i64,
        channel: &str,
    ) -> Result<(), NotifyError>;

    async fn notify_failure(
        &self,
        job_name: &str,
        duration_ms: i64,
        error: &str,
        channel: &str,
    ) -> Result<(), NotifyError>;
}

pub fn format_success(job_name: &str, duration_ms: i64) -> String {
    format!("✅ *{job_name}* completed ({}s)", duration_ms / 1000)
}

pub fn format_failure(job_name: &str, duration_ms: i64, error: &str) -> String {
    if error.is_empty() {
        format!("⚠️ *{job_name}* failed ({}s)", duration_ms / 1000)
    } else {
        format!("⚠️ *{job_name}* failed ({}s): {error}", duration_ms / 1000)
    }
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub successes: Mutex<Vec<String>>,
        pub failures: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_success(
            &self,
            job_name: &str,
            _duration_ms: i64,
            _channel: &str,
        ) -> Result<(), NotifyError> {
            self.successes.lock().unwrap().push(job_name.to_string());
            Ok(())
        }

        async fn notify_failure(
            &self,
            job_name: &str,
            _duration_ms: i64,
            _error: &str,
            _channel: &str,
        ) -> Result<(), NotifyError> {
            self.failures.lock().unwrap().push(job_name.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_success_message() {
        assert_eq!(format_success("backup", 4_500), "✅ *backup* completed (4s)");
    }

    #[test]
    fn formats_failure_message_with_error() {
        assert_eq!(
            format_failure("backup", 1_000, "disk full"),
            "⚠️ *backup* failed (1s): disk full"
        );
    }

    #[test]
    fn formats_failure_message_without_error() {
        assert_eq!(format_failure("backup", 1_000, ""), "⚠️ *backup* failed (1s)");
    }
}
