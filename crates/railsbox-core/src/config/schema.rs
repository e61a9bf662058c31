//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::env::vars::DEFAULT_WORKER_ENV;

/// Main railsbox configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Script execution bounds.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Worker process settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Path access settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Execution bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Timeout used when a request does not name one.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Lower clamp for requested timeouts.
    #[serde(default = "default_min_timeout_secs")]
    pub min_timeout_secs: u64,

    /// Upper clamp for requested timeouts.
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    /// Cap on captured script output.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            min_timeout_secs: default_min_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_min_timeout_secs() -> u64 {
    1
}

fn default_max_timeout_secs() -> u64 {
    60
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

/// Worker process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker executable. Defaults to the running binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,

    /// Environment variables copied into the worker.
    #[serde(default = "default_env_allowlist")]
    pub env_allowlist: Vec<String>,

    /// Apply a read-only Landlock ruleset in the worker (Linux).
    #[serde(default = "default_true")]
    pub landlock: bool,

    /// Address space limit for the worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_bytes: Option<u64>,

    /// Script engine operation budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_operations: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: None,
            env_allowlist: default_env_allowlist(),
            landlock: true,
            memory_limit_bytes: None,
            max_operations: None,
        }
    }
}

fn default_env_allowlist() -> Vec<String> {
    DEFAULT_WORKER_ENV.iter().map(|s| s.to_string()).collect()
}

/// Path access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Treat the project's `.gitignore` rules as sensitive patterns.
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Extra regex sources added to the built-in sensitive patterns.
    #[serde(default)]
    pub extra_sensitive_patterns: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            extra_sensitive_patterns: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, usable as a filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

fn default_true() -> bool {
    true
}
