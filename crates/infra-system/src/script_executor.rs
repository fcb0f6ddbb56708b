// Script-variant task executor (§4.4): spawns a job's `script` as a child
// process, captures bounded stdout/stderr tails, and enforces a timeout via
// graceful-then-forced termination.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use taskrunner_core::application::constants::{GRACEFUL_SHUTDOWN_TIMEOUT_MS, MAX_CAPTURED_LINES};
use taskrunner_core::domain::{Job, RunStatus};
use taskrunner_core::port::task_executor::{ExecutionError, ExecutionResult, TaskExecutor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

pub struct ScriptExecutor {
    db_path: String,
}

impl ScriptExecutor {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self { db_path: db_path.into() }
    }
}

/// Resolve a script path into the command and argument vector the host OS
/// should launch, based on the file extension (§4.4).
fn resolve_command(script: &str) -> (String, Vec<String>) {
    let ext = Path::new(script)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "ps1" => (
            "powershell".to_string(),
            vec!["-NoProfile".to_string(), "-File".to_string(), script.to_string()],
        ),
        "cmd" | "bat" => ("cmd".to_string(), vec!["/C".to_string(), script.to_string()]),
        "sh" => ("sh".to_string(), vec![script.to_string()]),
        "py" => ("python3".to_string(), vec![script.to_string()]),
        "js" | "mjs" | "cjs" => ("node".to_string(), vec![script.to_string()]),
        _ => (script.to_string(), vec![]),
    }
}

/// Scans captured stdout for `JR_RESULT:<json>` lines; the last match wins
/// (§4.4, P9). Recognized keys: `tokens` (integer), `meta` (string).
fn parse_result_marker(stdout_lines: &[String]) -> (Option<i64>, Option<String>) {
    let mut tokens = None;
    let mut meta = None;

    for line in stdout_lines {
        if let Some(rest) = line.strip_prefix("JR_RESULT:") {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(rest.trim()) {
                if let Some(t) = value.get("tokens").and_then(|v| v.as_i64()) {
                    tokens = Some(t);
                }
                if let Some(m) = value.get("meta").and_then(|v| v.as_str()) {
                    meta = Some(m.to_string());
                }
            }
        }
    }

    (tokens, meta)
}

/// Bounded ring buffer holding at most `cap` non-blank lines; oldest lines
/// are dropped once full (§4.4, P8).
struct RingBuffer {
    lines: Vec<String>,
    cap: usize,
}

impl RingBuffer {
    fn new(cap: usize) -> Self {
        Self { lines: Vec::with_capacity(cap), cap }
    }

    fn push(&mut self, line: String) {
        if line.trim().is_empty() {
            return;
        }
        if self.lines.len() >= self.cap {
            self.lines.remove(0);
        }
        self.lines.push(line);
    }

    fn join(&self) -> String {
        self.lines.join("\n")
    }
}

async fn capture_stream<R: tokio::io::AsyncRead + Unpin>(
    reader: R,
) -> Vec<String> {
    let mut buf = RingBuffer::new(MAX_CAPTURED_LINES);
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        buf.push(line);
    }
    buf.lines
}

#[cfg(unix)]
async fn kill_gracefully(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(raw_pid) = child.id() {
        let _ = kill(Pid::from_raw(raw_pid as i32), Signal::SIGTERM);
    }

    let grace = Duration::from_millis(GRACEFUL_SHUTDOWN_TIMEOUT_MS);
    if timeout(grace, child.wait()).await.is_err() {
        let _ = child.kill().await;
    }
}

#[cfg(not(unix))]
async fn kill_gracefully(child: &mut Child) {
    let grace = Duration::from_millis(GRACEFUL_SHUTDOWN_TIMEOUT_MS);
    let _ = child.start_kill();
    if timeout(grace, child.wait()).await.is_err() {
        let _ = child.kill().await;
    }
}

#[async_trait]
impl TaskExecutor for ScriptExecutor {
    async fn execute(&self, job: &Job, run_id: i64) -> Result<ExecutionResult, ExecutionError> {
        let (command, args) = resolve_command(&job.script);
        let start = Instant::now();

        let mut cmd = Command::new(&command);
        cmd.args(&args)
            .env("TASKRUNNER_DB_PATH", &self.db_path)
            .env("TASKRUNNER_JOB_ID", &job.id)
            .env("TASKRUNNER_RUN_ID", run_id.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let stdout_task = tokio::spawn(capture_stream(stdout));
        let stderr_task = tokio::spawn(capture_stream(stderr));

        let wait_result = match job.timeout_ms {
            Some(ms) if ms > 0 => {
                match timeout(Duration::from_millis(ms as u64), child.wait()).await {
                    Ok(status) => Some(status),
                    None => {
                        warn!(job_id = %job.id, run_id, timeout_ms = ms, "job timed out, terminating");
                        kill_gracefully(&mut child).await;
                        None
                    }
                }
            }
            _ => Some(child.wait().await),
        };

        let stdout_lines = stdout_task.await.unwrap_or_default();
        let stderr_lines = stderr_task.await.unwrap_or_default();
        let duration_ms = start.elapsed().as_millis() as i64;

        let stdout_tail = if stdout_lines.is_empty() { None } else { Some(stdout_lines.join("\n")) };
        let stderr_tail = if stderr_lines.is_empty() { None } else { Some(stderr_lines.join("\n")) };

        let Some(wait_result) = wait_result else {
            return Ok(ExecutionResult {
                status: RunStatus::Timeout,
                duration_ms,
                exit_code: None,
                tokens: None,
                result_meta: None,
                error: Some(format!("Job timed out after {}ms", job.timeout_ms.unwrap_or(0))),
                stdout_tail,
                stderr_tail,
            });
        };

        let status = wait_result.map_err(|e| ExecutionError::IoError(e.to_string()))?;
        let exit_code = status.code();

        let (tokens, result_meta) = parse_result_marker(&stdout_lines);

        if exit_code == Some(0) {
            info!(job_id = %job.id, run_id, duration_ms, "job completed successfully");
            Ok(ExecutionResult {
                status: RunStatus::Ok,
                duration_ms,
                exit_code,
                tokens,
                result_meta,
                error: None,
                stdout_tail,
                stderr_tail,
            })
        } else {
            let error = stderr_tail
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("Exit code {}", exit_code.unwrap_or(-1)));
            Ok(ExecutionResult {
                status: RunStatus::Error,
                duration_ms,
                exit_code,
                tokens,
                result_meta,
                error: Some(error),
                stdout_tail,
                stderr_tail,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskrunner_core::domain::JobType;

    #[test]
    fn resolves_known_extensions() {
        assert_eq!(resolve_command("a.sh").0, "sh");
        assert_eq!(resolve_command("a.py").0, "python3");
        assert_eq!(resolve_command("a.js").0, "node");
        assert_eq!(resolve_command("a.ps1").0, "powershell");
        assert_eq!(resolve_command("a.bat").0, "cmd");
    }

    #[test]
    fn falls_back_to_direct_invocation() {
        let (cmd, args) = resolve_command("/usr/local/bin/my-tool");
        assert_eq!(cmd, "/usr/local/bin/my-tool");
        assert!(args.is_empty());
    }

    #[test]
    fn parses_last_result_marker_wins() {
        let lines = vec![
            "JR_RESULT:{\"tokens\": 10}".to_string(),
            "some noise".to_string(),
            "JR_RESULT:{\"tokens\": 42, \"meta\": \"done\"}".to_string(),
        ];
        let (tokens, meta) = parse_result_marker(&lines);
        assert_eq!(tokens, Some(42));
        assert_eq!(meta, Some("done".to_string()));
    }

    #[tokio::test]
    async fn executes_successful_script() {
        let executor = ScriptExecutor::new("/tmp/test.db");
        let job = Job::new("j1", "echo job", "0 2 * * *", "/bin/echo", JobType::Script, 0);
        let result = executor.execute(&job, 1).await.unwrap();
        assert_eq!(result.status, RunStatus::Ok);
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn reports_nonzero_exit_as_error() {
        let executor = ScriptExecutor::new("/tmp/test.db");
        let (cmd, _) = resolve_command("x.sh");
        assert_eq!(cmd, "sh");
        let job = Job::new("j2", "fail job", "0 2 * * *", "/bin/false", JobType::Script, 0);
        let result = executor.execute(&job, 2).await.unwrap();
        assert_eq!(result.status, RunStatus::Error);
        assert_eq!(result.exit_code, Some(1));
    }

    #[tokio::test]
    async fn spawn_failure_surfaces_as_execution_error() {
        let executor = ScriptExecutor::new("/tmp/test.db");
        let job = Job::new(
            "j3",
            "bad job",
            "0 2 * * *",
            "/nonexistent/path/to/nowhere",
            JobType::Script,
            0,
        );
        let result = executor.execute(&job, 3).await;
        assert!(result.is_err());
    }
}
