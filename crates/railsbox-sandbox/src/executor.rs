//! Running scripts in worker processes.
//!
//! [`ScriptRunner`] is the seam between the host and whatever actually runs
//! the script. [`ProcessRunner`] launches one worker process per request,
//! feeds it the request on stdin and kills it at the deadline.
//! [`ExecutionHost`] clamps the timeout, calls the runner and turns whatever
//! comes back into an [`ExecutionResult`].

use crate::engine::ScriptReport;
use crate::error::SandboxError;
use crate::limits::ExecutionLimits;
use crate::outcome::ExecutionResult;
use crate::worker::{WorkerOptions, WorkerRequest};
use crate::Result;
use async_trait::async_trait;
use railsbox_core::env::{get_filtered_env, vars::DEFAULT_WORKER_ENV};
use railsbox_core::{Config, ProjectRoot};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs script text inside a project root and returns the raw report text.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` with `root` as its boundary, giving up at `deadline`.
    ///
    /// Returns [`SandboxError::Timeout`] once the deadline passes; by then the
    /// execution must be stopped, not merely abandoned.
    async fn execute_in_project(
        &self,
        root: &ProjectRoot,
        script: &str,
        deadline: Duration,
    ) -> Result<String>;
}

/// Runs each request in a fresh worker process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Worker executable.
    program: PathBuf,

    /// Arguments selecting the worker entry point.
    args: Vec<String>,

    /// Variables copied from the host environment.
    env_allowlist: Vec<String>,

    /// Options forwarded with every request.
    options: WorkerOptions,

    /// Maximum stdout/stderr size to capture.
    max_capture_bytes: usize,
}

impl ProcessRunner {
    /// Create a runner for the given worker executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let options = WorkerOptions::default();
        Self {
            program: program.into(),
            args: vec!["worker".to_string()],
            env_allowlist: DEFAULT_WORKER_ENV.iter().map(|s| s.to_string()).collect(),
            max_capture_bytes: capture_limit(options.max_output_bytes),
            options,
        }
    }

    /// Runner re-invoking the current executable.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| SandboxError::spawn(format!("Cannot locate current executable: {}", e)))?;
        Ok(Self::new(program))
    }

    /// Runner configured from the loaded config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let runner = match &config.worker.program {
            Some(program) => Self::new(program),
            None => Self::current_exe()?,
        };
        Ok(runner
            .with_env_allowlist(config.worker.env_allowlist.clone())
            .with_options(WorkerOptions::from_config(config)))
    }

    /// Replace the worker arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Replace the environment allowlist.
    pub fn with_env_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.env_allowlist = allowlist;
        self
    }

    /// Replace the forwarded worker options.
    pub fn with_options(mut self, options: WorkerOptions) -> Self {
        self.max_capture_bytes = capture_limit(options.max_output_bytes);
        self.options = options;
        self
    }

    /// The worker executable.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

/// The report line carries the output JSON-escaped, so leave room for it.
fn capture_limit(max_output_bytes: usize) -> usize {
    max_output_bytes.saturating_mul(6).saturating_add(64 * 1024)
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    async fn execute_in_project(
        &self,
        root: &ProjectRoot,
        script: &str,
        deadline: Duration,
    ) -> Result<String> {
        let request = WorkerRequest {
            root: root.as_path().to_path_buf(),
            script: script.to_string(),
            options: self.options.clone(),
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| SandboxError::protocol(e.to_string()))?;

        debug!(program = ?self.program, root = %root, "Spawning worker");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(root.as_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .envs(get_filtered_env(&self.env_allowlist))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::spawn(format!("{}: {}", self.program.display(), e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::spawn("worker stdin unavailable"))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        });
        let stdout = tokio::spawn(read_stream(child.stdout.take(), self.max_capture_bytes));
        let stderr = tokio::spawn(read_stream(child.stderr.take(), self.max_capture_bytes));

        let status = match timeout(deadline, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!("Worker exceeded {:?}, killing it", deadline);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill worker: {}", e);
                }
                writer.abort();
                stdout.abort();
                stderr.abort();
                return Err(SandboxError::Timeout(deadline.as_secs()));
            }
        };

        if let Ok(Err(e)) = writer.await {
            debug!("Worker did not take the whole request: {}", e);
        }
        let stdout = stdout.await.ok().flatten().unwrap_or_default();
        let stderr = stderr.await.ok().flatten().unwrap_or_default();

        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim_end(), "Worker wrote to stderr");
        }

        if !status.success() {
            return Err(SandboxError::ProcessFailed {
                code: status.code(),
                output: stderr,
            });
        }

        Ok(stdout)
    }
}

/// Read from an async stream with size limit.
async fn read_stream(
    handle: Option<impl tokio::io::AsyncRead + Unpin>,
    max_size: usize,
) -> Option<String> {
    let handle = handle?;
    let mut reader = BufReader::new(handle);
    let mut output = Vec::new();
    let mut total_read = 0;

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(n) => {
                total_read += n;
                if total_read > max_size {
                    output.extend_from_slice(b"\n[Output truncated]\n");
                    break;
                }
                output.extend_from_slice(line.as_bytes());
            }
            Err(e) => {
                warn!("Error reading stream: {}", e);
                break;
            }
        }
    }

    String::from_utf8(output).ok()
}

/// Decode the report from a worker's stdout: the last non-empty line.
pub fn decode_report(stdout: &str) -> Result<ScriptReport> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| SandboxError::protocol("worker produced no report"))?;
    serde_json::from_str(line).map_err(|e| SandboxError::protocol(e.to_string()))
}

/// Clamps timeouts, runs scripts and maps every ending to a result.
#[derive(Clone)]
pub struct ExecutionHost {
    runner: Arc<dyn ScriptRunner>,
    limits: ExecutionLimits,
}

impl ExecutionHost {
    /// Create a host around a runner.
    pub fn new(runner: Arc<dyn ScriptRunner>, limits: ExecutionLimits) -> Self {
        Self { runner, limits }
    }

    /// The limits in force.
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Run script text with the requested timeout, clamped.
    pub async fn run(&self, root: &ProjectRoot, script: &str, timeout: Option<i64>) -> ExecutionResult {
        let secs = self.limits.clamp_timeout(timeout);
        debug!(timeout_secs = secs, "Running script");

        match self
            .runner
            .execute_in_project(root, script, self.limits.deadline(secs))
            .await
        {
            Ok(stdout) => match decode_report(&stdout) {
                Ok(report) => ExecutionResult::from(report),
                Err(e) => {
                    warn!("Discarding worker output: {}", e);
                    ExecutionResult::runtime_error(
                        "ProtocolError",
                        "worker returned an unreadable report",
                    )
                }
            },
            Err(SandboxError::Timeout(_)) => ExecutionResult::Timeout(secs),
            Err(e @ SandboxError::ProcessFailed { .. }) => {
                warn!("{}", e);
                ExecutionResult::runtime_error("WorkerError", e.to_string())
            }
            Err(e) => {
                warn!("Worker failed: {}", e);
                ExecutionResult::runtime_error("WorkerError", "the worker could not be run")
            }
        }
    }
}
