//! Read-only script execution against a Rails project tree.
//!
//! A request passes through two layers:
//! - the forbidden-construct scanner, which rejects text before anything runs
//! - a worker process running a Rhai engine whose only I/O is the
//!   [`AccessMediator`], hardened on Linux with Landlock and resource limits
//!
//! The host enforces the deadline by killing the worker.

pub mod engine;
pub mod error;
pub mod executor;
pub mod hardening;
pub mod limits;
pub mod mediator;
pub mod outcome;
pub mod worker;

#[cfg(target_os = "linux")]
pub mod linux;

pub use engine::{evaluate, EngineOptions, ScriptReport, ScriptStatus};
pub use error::SandboxError;
pub use executor::{decode_report, ExecutionHost, ProcessRunner, ScriptRunner};
pub use limits::ExecutionLimits;
pub use mediator::{AccessMediator, MediatorError, ReadView};
pub use outcome::{
    ExecutionOutcome, ExecutionResult, ExecutionState, Violation, ViolationKind, NO_OUTPUT_MESSAGE,
};
pub use worker::{serve_stdio, WorkerOptions, WorkerRequest};

use railsbox_core::{Config, ForbiddenConstructScanner, ProjectRoot};
use std::sync::Arc;
use tracing::debug;

/// Result type for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// One script submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Script text.
    pub code: String,
    /// Requested timeout in seconds; clamped by the host.
    pub timeout: Option<i64>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, secs: i64) -> Self {
        self.timeout = Some(secs);
        self
    }
}

/// Scanner plus execution host, bound to one project root.
pub struct Sandbox {
    root: ProjectRoot,
    scanner: ForbiddenConstructScanner,
    host: ExecutionHost,
}

impl Sandbox {
    /// Create a sandbox with the default scanner rules.
    pub fn new(root: ProjectRoot, host: ExecutionHost) -> Self {
        Self {
            root,
            scanner: ForbiddenConstructScanner::default(),
            host,
        }
    }

    /// Sandbox running workers as configured.
    pub fn from_config(root: ProjectRoot, config: &Config) -> Result<Self> {
        let runner = ProcessRunner::from_config(config)?;
        let host = ExecutionHost::new(Arc::new(runner), ExecutionLimits::from(&config.execution));
        Ok(Self::new(root, host))
    }

    /// Replace the scanner.
    pub fn with_scanner(mut self, scanner: ForbiddenConstructScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// The project root.
    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    /// Scan, then run. Rejected text never reaches the runner.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        transition(ExecutionState::Submitted);
        transition(ExecutionState::Scanning);

        if let Some(found) = self.scanner.scan(&request.code) {
            transition(ExecutionState::Rejected);
            return ExecutionOutcome::Rejected(found);
        }

        transition(ExecutionState::Sandboxed);
        transition(ExecutionState::Running);

        let result = self.host.run(&self.root, &request.code, request.timeout).await;
        transition(result.state());
        ExecutionOutcome::Finished(result)
    }
}

fn transition(state: ExecutionState) {
    debug!(state = %state, "Execution state");
}
