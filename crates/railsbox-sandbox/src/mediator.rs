//! The access mediator: the only I/O surface handed to script text.
//!
//! Every read goes through the project's [`PathValidator`]. Listings and glob
//! results are re-validated entry by entry, since an allowed directory may hold
//! denied children. Mutation and process entry points never reach the
//! filesystem or process table; they only produce a write violation.

use std::io;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use railsbox_core::guard::{is_excluded_directory, PathValidator, ProjectRoot};
use railsbox_core::SecurityError;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::outcome::Violation;

/// Failure of a mediated operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediatorError {
    /// The operation was denied.
    #[error("{0}")]
    Violation(Violation),

    /// The operation was allowed but failed.
    #[error("{class} - {message}")]
    Fault { class: String, message: String },
}

impl MediatorError {
    fn argument(message: impl Into<String>) -> Self {
        Self::Fault {
            class: "ArgumentError".to_string(),
            message: message.into(),
        }
    }

    fn io(err: &io::Error, shown: &str) -> Self {
        let reason = match err.kind() {
            io::ErrorKind::NotFound => "No such file or directory",
            io::ErrorKind::PermissionDenied => "Permission denied",
            io::ErrorKind::InvalidData => "File is not valid UTF-8",
            _ => "Read failed",
        };
        Self::Fault {
            class: "IOError".to_string(),
            message: format!("{} - {}", reason, shown),
        }
    }
}

impl From<Violation> for MediatorError {
    fn from(v: Violation) -> Self {
        Self::Violation(v)
    }
}

/// In-memory, read-only view of a validated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadView {
    content: String,
}

impl ReadView {
    /// Whole content.
    pub fn read(&self) -> &str {
        &self.content
    }

    /// Lines without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.content.lines().map(str::to_string).collect()
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Whether an open mode is strictly read-only (`r`, `rb`, `rt`, `r:UTF-8`).
/// Anything else, including modes we do not recognize, counts as a write.
pub fn is_read_only_mode(mode: &str) -> bool {
    let flags = mode.split(':').next().unwrap_or_default();
    flags.starts_with('r') && flags.chars().all(|c| matches!(c, 'r' | 'b' | 't'))
}

/// Capability object wrapping one project's validator.
#[derive(Debug, Clone)]
pub struct AccessMediator {
    validator: PathValidator,
}

impl AccessMediator {
    /// Create a mediator around a validator. Has no filesystem effect.
    pub fn new(validator: PathValidator) -> Self {
        Self { validator }
    }

    /// Mediator for a project using its full default rule set.
    pub fn for_project(root: ProjectRoot) -> Self {
        Self::new(PathValidator::for_project(root))
    }

    /// The validator in use.
    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// The project root as a string.
    pub fn project_root(&self) -> String {
        self.validator.root().to_string()
    }

    /// Validate a caller path, mapping denials to violations.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, Violation> {
        self.validator.check(path).map_err(|e| match e {
            SecurityError::SensitivePath { .. } => Violation::sensitive(e.to_string()),
            SecurityError::EmptyPath => Violation::path(
                SecurityError::PathOutsideRoot {
                    attempted: String::new(),
                }
                .to_string(),
            ),
            other => Violation::path(other.to_string()),
        })
    }

    /// Read a whole file.
    pub fn read(&self, path: &str) -> Result<String, MediatorError> {
        let canonical = self.resolve(path)?;
        if canonical.is_dir() {
            return Err(MediatorError::Fault {
                class: "IOError".to_string(),
                message: format!("Is a directory - {}", path),
            });
        }
        std::fs::read_to_string(&canonical).map_err(|e| MediatorError::io(&e, path))
    }

    /// Whether the path exists. Denied paths raise rather than answer.
    pub fn exists(&self, path: &str) -> Result<bool, MediatorError> {
        Ok(self.resolve(path)?.exists())
    }

    /// Whether the path is a regular file.
    pub fn is_file(&self, path: &str) -> Result<bool, MediatorError> {
        Ok(self.resolve(path)?.is_file())
    }

    /// Whether the path is a directory.
    pub fn is_directory(&self, path: &str) -> Result<bool, MediatorError> {
        Ok(self.resolve(path)?.is_dir())
    }

    /// Open a file for reading. Write or unrecognized modes are denied before
    /// the path is even looked at.
    pub fn open(&self, path: &str, mode: Option<&str>) -> Result<ReadView, MediatorError> {
        if let Some(mode) = mode {
            if !is_read_only_mode(mode) {
                return Err(Violation::write(format!(
                    "Write operations are not permitted: File::open with mode '{}'",
                    mode
                ))
                .into());
            }
        }
        let content = self.read(path)?;
        Ok(ReadView { content })
    }

    /// Names in a directory, without dot-entries and without any child that
    /// fails validation on its own.
    pub fn entries(&self, dir: &str) -> Result<Vec<String>, MediatorError> {
        let canonical = self.resolve(dir)?;
        let relative = self.validator.relative(&canonical).unwrap_or_default();
        let read_dir = std::fs::read_dir(&canonical).map_err(|e| MediatorError::io(&e, dir))?;

        let mut names = Vec::new();
        for entry in read_dir.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let child = format!("{}/{}", relative, name);
            if self.validator.validate(&child).is_allowed() {
                names.push(name);
            } else {
                debug!(path = %child, "Filtered denied directory entry");
            }
        }

        names.sort();
        Ok(names)
    }

    /// Root-relative paths matching a glob, each re-validated.
    ///
    /// `*` and `?` stay within one segment, `**` crosses segments. Patterns are
    /// always relative to the project root; absolute or `..` patterns are
    /// path violations.
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>, MediatorError> {
        let segments = glob_segments(pattern)?;
        let normalized = segments.join("/");

        let matcher = GlobBuilder::new(&normalized)
            .literal_separator(true)
            .build()
            .map_err(|e| MediatorError::argument(format!("Invalid glob pattern '{}': {}", pattern, e)))?
            .compile_matcher();

        let literal = segments
            .iter()
            .take_while(|s| !has_glob_meta(s))
            .count();
        let prefix = segments[..literal].join("/");
        let root = self.validator.root().as_path();
        let start = root.join(&prefix);
        if std::fs::symlink_metadata(&start).is_err() {
            return Ok(Vec::new());
        }

        let max_depth = if segments.iter().any(|s| s.contains("**")) {
            usize::MAX
        } else {
            segments.len() - literal
        };
        let prefix_excluded = !prefix.is_empty() && is_excluded_directory(&prefix);

        let walker = WalkDir::new(&start)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let rel = relative_to(root, e.path());
                let pruned = (!prefix_excluded && is_excluded_directory(&rel))
                    || self.validator.patterns().is_sensitive(&rel);
                !pruned
            });

        let mut matches = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable glob entry: {}", e);
                    continue;
                }
            };
            let rel = relative_to(root, entry.path());
            if rel.is_empty() || !matcher.is_match(&rel) {
                continue;
            }
            if self.validator.validate(&rel).is_allowed() {
                matches.push(rel);
            } else {
                debug!(path = %rel, "Filtered denied glob match");
            }
        }

        matches.sort();
        matches.dedup();
        Ok(matches)
    }

    /// The violation for a mutation or process entry point.
    pub fn deny(&self, entry_point: &str) -> Violation {
        debug!(entry_point, "Denied mutating operation");
        Violation::write(denial_message(entry_point))
    }
}

fn denial_message(entry_point: &str) -> String {
    let (module, function) = entry_point
        .split_once("::")
        .unwrap_or(("", entry_point));

    match (module, function) {
        ("FileUtils", _) => "FileUtils operations are not permitted".to_string(),
        ("Dir", _) | ("", "mkdir") | ("", "rmdir") => {
            format!("Directory modifications are not permitted: {}", entry_point)
        }
        ("IO", "popen") | ("IO", "pipe") | ("", "shell") | ("", "popen") => {
            "Shell execution is not permitted".to_string()
        }
        ("Process", _) | ("Kernel", _) | ("Open3", _) => "System calls are not permitted".to_string(),
        ("", "system") | ("", "exec") | ("", "spawn") | ("", "fork") => {
            "System calls are not permitted".to_string()
        }
        _ => format!("Write operations are not permitted: {}", entry_point),
    }
}

fn has_glob_meta(segment: &str) -> bool {
    segment.contains(|c| matches!(c, '*' | '?' | '[' | '{'))
}

/// Split a glob into non-empty, non-`.` segments, rejecting anything that
/// could leave the root.
fn glob_segments(pattern: &str) -> Result<Vec<&str>, MediatorError> {
    let outside = || {
        MediatorError::Violation(Violation::path(
            SecurityError::PathOutsideRoot {
                attempted: pattern.to_string(),
            }
            .to_string(),
        ))
    };

    if pattern.starts_with('/') || pattern.contains('\0') {
        return Err(outside());
    }
    let segments: Vec<&str> = pattern
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() || segments.iter().any(|s| *s == "..") {
        return Err(outside());
    }
    Ok(segments)
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
