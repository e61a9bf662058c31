//! Landlock filesystem restriction for the worker process.

use crate::error::SandboxError;
use crate::Result;
use landlock::{
    Access, AccessFs, PathBeneath, PathFd, RestrictionStatus, Ruleset, RulesetAttr,
    RulesetCreatedAttr, RulesetStatus, ABI,
};
use std::path::Path;
use tracing::{debug, warn};

/// Restrict the current process to reading beneath `root`.
///
/// Every filesystem right the ABI knows about is handled, and only the read
/// rights are granted, only for `root`. Irreversible for this process.
pub fn restrict_to_read_only(root: &Path) -> Result<RulesetStatus> {
    let abi = ABI::V3;

    let fd = PathFd::new(root).map_err(|e| SandboxError::Landlock(e.to_string()))?;

    let status: RestrictionStatus = Ruleset::default()
        .handle_access(AccessFs::from_all(abi))
        .map_err(|e| SandboxError::Landlock(e.to_string()))?
        .create()
        .map_err(|e| SandboxError::Landlock(e.to_string()))?
        .add_rule(PathBeneath::new(fd, AccessFs::from_read(abi)))
        .map_err(|e| SandboxError::Landlock(e.to_string()))?
        .restrict_self()
        .map_err(|e| SandboxError::Landlock(e.to_string()))?;

    match status.ruleset {
        RulesetStatus::NotEnforced => {
            warn!("Landlock is not supported by this kernel; relying on the mediator alone")
        }
        RulesetStatus::PartiallyEnforced => {
            debug!("Landlock ruleset partially enforced for {:?}", root)
        }
        RulesetStatus::FullyEnforced => debug!("Landlock ruleset enforced for {:?}", root),
    }

    Ok(status.ruleset)
}
