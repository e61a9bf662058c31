//! Path canonicalization against a project root.
//!
//! Existing paths are resolved by the operating system, so symlinks are always
//! followed to their real target. Paths that do not exist yet are resolved up
//! to their deepest existing ancestor and the remainder is applied lexically.
//! Nothing here touches the filesystem beyond `canonicalize` lookups.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `root` into an absolute, symlink-free path.
///
/// Relative paths are joined onto `root`; absolute paths are resolved as-is.
/// Never fails: a path that cannot be resolved at all falls back to lexical
/// normalization.
pub fn canonicalize(path: &Path, root: &Path) -> PathBuf {
    let mut current = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    // Two rounds at most: the first may collapse `missing/..` pairs, which can
    // expose an existing (possibly symlinked) path that must be resolved again.
    for _ in 0..2 {
        if let Ok(resolved) = std::fs::canonicalize(&current) {
            return resolved;
        }

        let (resolved_prefix, tail) = split_existing(&current);
        let needs_retry = tail.iter().any(|c| matches!(c, Component::ParentDir));

        let mut joined = resolved_prefix;
        for component in &tail {
            joined.push(component.as_os_str());
        }
        let normalized = normalize_lexically(&joined);

        if !needs_retry {
            return normalized;
        }
        current = normalized;
    }

    normalize_lexically(&current)
}

/// Split `path` into its deepest OS-resolvable ancestor and the components
/// that follow it.
fn split_existing(path: &Path) -> (PathBuf, Vec<Component<'_>>) {
    let components: Vec<Component<'_>> = path.components().collect();

    for split in (1..components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        if let Ok(resolved) = std::fs::canonicalize(&prefix) {
            return (resolved, components[split..].to_vec());
        }
    }

    (PathBuf::from("/"), components)
}

/// Collapse `.` and `..` segments without consulting the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut stack = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                stack.pop();
            }
            Component::Normal(c) => stack.push(c),
            Component::RootDir => {
                stack.clear();
            }
            Component::Prefix(_) => {}
        }
    }

    let mut result = PathBuf::from("/");
    for c in stack {
        result.push(c);
    }
    result
}
