// Application-wide constants (no magic values)
use std::time::Duration;

/// Default session-variant timeout (§4.5, §5).
pub const DEFAULT_SESSION_TIMEOUT_MS: i64 = 300_000;

/// Default session poll interval, grows by 1.2x per round, capped below (§4.5).
pub const DEFAULT_SESSION_POLL_INTERVAL_MS: u64 = 5_000;
pub const SESSION_POLL_BACKOFF_FACTOR: f64 = 1.2;
pub const SESSION_POLL_INTERVAL_CAP_MS: u64 = 15_000;

/// Graceful-then-forced child process termination (§4.4).
pub const GRACEFUL_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Ring buffer bound on captured stdout/stderr tails (§4.4, P8).
pub const MAX_CAPTURED_LINES: usize = 100;

/// Poll interval while waiting for in-flight runs to finish on shutdown (§4.7).
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default overlap policy / concurrency defaults (§6).
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_RUN_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 30_000;
pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_STATE_CLEANUP_INTERVAL_MS: u64 = 3_600_000;
