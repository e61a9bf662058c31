//! Resource limits for the worker process.

use crate::error::SandboxError;
use crate::Result;
use nix::sys::resource::{setrlimit, Resource};
use tracing::debug;

/// Forbid file growth and core dumps, and cap the address space if asked.
pub fn apply_resource_limits(memory_limit_bytes: Option<u64>) -> Result<()> {
    set(Resource::RLIMIT_FSIZE, 0)?;
    set(Resource::RLIMIT_CORE, 0)?;
    if let Some(bytes) = memory_limit_bytes {
        set(Resource::RLIMIT_AS, bytes)?;
    }
    debug!(memory_limit_bytes, "Resource limits applied");
    Ok(())
}

fn set(resource: Resource, limit: u64) -> Result<()> {
    let limit = limit as nix::libc::rlim_t;
    setrlimit(resource, limit, limit)
        .map_err(|e| SandboxError::Limits(format!("{:?}: {}", resource, e)))
}
