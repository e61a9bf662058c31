//! Sandbox error types.

use std::io;
use thiserror::Error;

/// Errors that can occur while running a script in a worker.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The worker process could not be started.
    #[error("Failed to spawn worker: {0}")]
    Spawn(String),

    /// The worker exited unsuccessfully.
    #[error("Worker exited with {}", describe_exit(.code))]
    ProcessFailed {
        /// Exit code, if the worker exited normally.
        code: Option<i32>,
        /// Captured stderr, for logs only.
        output: String,
    },

    /// The worker exceeded its deadline and was killed.
    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),

    /// The worker's report could not be decoded.
    #[error("Worker protocol error: {0}")]
    Protocol(String),

    /// Landlock error (Linux).
    #[error("Landlock error: {0}")]
    Landlock(String),

    /// Resource limit setup failed.
    #[error("Resource limit error: {0}")]
    Limits(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl SandboxError {
    /// Create a new spawn error.
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create a new protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Check if this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
