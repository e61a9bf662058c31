//! Defense-in-depth restrictions the worker applies to itself before running
//! any script text. Best effort: a failure is logged and the worker carries
//! on, since the mediator remains the enforcement boundary.

use std::path::Path;

use tracing::debug;
#[cfg(target_os = "linux")]
use tracing::warn;

/// Which restrictions to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardeningOptions {
    /// Apply the Landlock read-only ruleset.
    pub landlock: bool,
    /// Address-space cap, in bytes.
    pub memory_limit_bytes: Option<u64>,
}

impl Default for HardeningOptions {
    fn default() -> Self {
        Self {
            landlock: true,
            memory_limit_bytes: None,
        }
    }
}

/// Restrict the current process. Irreversible.
#[cfg(target_os = "linux")]
pub fn harden(root: &Path, options: &HardeningOptions) {
    if let Err(e) = crate::linux::apply_resource_limits(options.memory_limit_bytes) {
        warn!("Failed to apply resource limits: {}", e);
    }

    if options.landlock {
        if let Err(e) = crate::linux::restrict_to_read_only(root) {
            warn!("Failed to apply Landlock ruleset: {}", e);
        }
    } else {
        debug!("Landlock disabled by configuration");
    }
}

/// No process-level restrictions outside Linux.
#[cfg(not(target_os = "linux"))]
pub fn harden(root: &Path, options: &HardeningOptions) {
    debug!(?root, ?options, "Worker hardening is only available on Linux");
}
