//! Execution bounds for a single request.

use railsbox_core::config::ExecutionConfig;
use std::time::Duration;

/// Timeout clamp range applied by the execution host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Timeout used when a request does not name one.
    pub default_timeout_secs: u64,

    /// Lower clamp.
    pub min_timeout_secs: u64,

    /// Upper clamp.
    pub max_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_min_timeout() -> u64 {
    1
}

fn default_max_timeout() -> u64 {
    60
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout(),
            min_timeout_secs: default_min_timeout(),
            max_timeout_secs: default_max_timeout(),
        }
    }
}

impl From<&ExecutionConfig> for ExecutionLimits {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            default_timeout_secs: config.default_timeout_secs,
            min_timeout_secs: config.min_timeout_secs,
            max_timeout_secs: config.max_timeout_secs,
        }
    }
}

impl ExecutionLimits {
    /// Create new limits with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a requested timeout: `None` takes the default, anything else
    /// is clamped into `[min, max]`. Never rejects.
    pub fn clamp_timeout(&self, requested: Option<i64>) -> u64 {
        let min = self.min_timeout_secs.max(1);
        let max = self.max_timeout_secs.max(min);

        match requested {
            None => self.default_timeout_secs.clamp(min, max),
            Some(secs) if secs <= 0 => min,
            Some(secs) => (secs as u64).clamp(min, max),
        }
    }

    /// Deadline for a resolved timeout.
    pub fn deadline(&self, timeout_secs: u64) -> Duration {
        Duration::from_secs(timeout_secs)
    }

    /// Builder-style method to set the timeout range.
    pub fn with_timeouts(mut self, default_secs: u64, min_secs: u64, max_secs: u64) -> Self {
        self.default_timeout_secs = default_secs;
        self.min_timeout_secs = min_secs;
        self.max_timeout_secs = max_secs;
        self
    }
}
