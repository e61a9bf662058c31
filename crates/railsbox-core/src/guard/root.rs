//! The project root boundary.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SecurityError;

/// An absolute, canonical directory that bounds every access.
///
/// Construction resolves symlinks once; the value never changes afterwards, so
/// a validator or mediator built from it keeps a fixed boundary for its whole
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    /// Canonicalize `path` and check that it names an existing directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SecurityError> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).map_err(|e| SecurityError::InvalidRoot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !canonical.is_dir() {
            return Err(SecurityError::InvalidRoot {
                path: path.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        Ok(Self(canonical))
    }

    /// Get the root as a path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Path of `path` relative to the root, with `/` separators.
    ///
    /// Returns `None` when `path` is not beneath the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.0).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl AsRef<Path> for ProjectRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ProjectRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
