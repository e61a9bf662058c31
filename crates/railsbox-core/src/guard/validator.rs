//! The path access decision.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::canonical::canonicalize;
use super::patterns::SensitivePatternRegistry;
use super::root::ProjectRoot;
use crate::error::SecurityError;

/// Result of validating one path against a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The canonical path, a strict descendant of the root.
    Allowed(PathBuf),
    /// Empty, the root itself, or anything resolving outside it.
    DeniedOutsideRoot,
    /// Inside the root but matched the given pattern source.
    DeniedSensitive(String),
}

impl ValidationOutcome {
    /// Whether access is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// The canonical path, if allowed.
    pub fn allowed_path(&self) -> Option<&Path> {
        match self {
            Self::Allowed(path) => Some(path),
            _ => None,
        }
    }
}

/// Validate `path` against `root` and `patterns`.
///
/// Pure with respect to its inputs: the same arguments against the same tree
/// always give the same outcome.
pub fn validate(
    path: &str,
    root: &ProjectRoot,
    patterns: &SensitivePatternRegistry,
) -> ValidationOutcome {
    if path.is_empty() || path.contains('\0') {
        return ValidationOutcome::DeniedOutsideRoot;
    }

    let canonical = canonicalize(Path::new(path), root.as_path());
    if canonical == root.as_path() || !canonical.starts_with(root.as_path()) {
        debug!(path = %path, "Path resolves outside project root");
        return ValidationOutcome::DeniedOutsideRoot;
    }

    let Some(relative) = root.relative(&canonical) else {
        return ValidationOutcome::DeniedOutsideRoot;
    };

    if let Some(pattern) = patterns.find_match(&relative) {
        debug!(path = %relative, pattern = %pattern.source(), "Sensitive path denied");
        return ValidationOutcome::DeniedSensitive(pattern.source().to_string());
    }

    ValidationOutcome::Allowed(canonical)
}

/// A project root bound to its merged pattern set.
#[derive(Debug, Clone)]
pub struct PathValidator {
    root: ProjectRoot,
    patterns: Arc<SensitivePatternRegistry>,
}

impl PathValidator {
    /// Create a validator from an explicit pattern set.
    pub fn new(root: ProjectRoot, patterns: SensitivePatternRegistry) -> Self {
        Self {
            root,
            patterns: Arc::new(patterns),
        }
    }

    /// Create a validator using the built-in patterns plus the project's
    /// `.gitignore` rules.
    pub fn for_project(root: ProjectRoot) -> Self {
        let patterns = SensitivePatternRegistry::for_project(&root);
        Self::new(root, patterns)
    }

    /// The project root.
    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    /// The merged pattern set.
    pub fn patterns(&self) -> &SensitivePatternRegistry {
        &self.patterns
    }

    /// Validate a caller-supplied path.
    pub fn validate(&self, path: &str) -> ValidationOutcome {
        validate(path, &self.root, &self.patterns)
    }

    /// Validate a path and turn denials into errors.
    pub fn check(&self, path: &str) -> Result<PathBuf, SecurityError> {
        match self.validate(path) {
            ValidationOutcome::Allowed(canonical) => Ok(canonical),
            ValidationOutcome::DeniedOutsideRoot if path.is_empty() => Err(SecurityError::EmptyPath),
            ValidationOutcome::DeniedOutsideRoot => Err(SecurityError::PathOutsideRoot {
                attempted: path.to_string(),
            }),
            ValidationOutcome::DeniedSensitive(pattern) => {
                let canonical = canonicalize(Path::new(path), self.root.as_path());
                let relative = self
                    .root
                    .relative(&canonical)
                    .unwrap_or_else(|| path.to_string());
                Err(SecurityError::SensitivePath { relative, pattern })
            }
        }
    }

    /// Root-relative form of an allowed canonical path.
    pub fn relative(&self, canonical: &Path) -> Option<String> {
        self.root.relative(canonical)
    }

    /// Keep only the entries that validate as allowed, in their original form.
    pub fn filter<P: AsRef<Path>>(&self, paths: impl IntoIterator<Item = P>) -> Vec<PathBuf> {
        paths
            .into_iter()
            .filter(|p| self.validate(&p.as_ref().to_string_lossy()).is_allowed())
            .map(|p| p.as_ref().to_path_buf())
            .collect()
    }
}

/// Validate a path against a project root using the project's full rule set.
pub fn validate_path(path: &str, root: &Path) -> Result<PathBuf, SecurityError> {
    let root = ProjectRoot::new(root)?;
    PathValidator::for_project(root).check(path)
}

/// Drop sensitive entries, and anything outside the root, from a listing.
///
/// An invalid root yields an empty listing.
pub fn filter_sensitive<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>, root: &Path) -> Vec<PathBuf> {
    match ProjectRoot::new(root) {
        Ok(root) => PathValidator::for_project(root).filter(paths),
        Err(e) => {
            debug!("Cannot filter listing: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_project() -> (TempDir, PathValidator) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("app/models")).unwrap();
        std::fs::create_dir_all(root.join("config/credentials")).unwrap();
        std::fs::write(root.join("app/models/user.rb"), "class User; end").unwrap();
        std::fs::write(root.join("config/routes.rb"), "Rails.application.routes.draw do\nend\n")
            .unwrap();
        std::fs::write(root.join(".env"), "SECRET_KEY_BASE=abc").unwrap();
        std::fs::write(root.join("config/master.key"), "deadbeef").unwrap();
        std::fs::write(root.join(".gitignore"), "/log/*\n*.sqlite3\n").unwrap();

        let validator = PathValidator::for_project(ProjectRoot::new(root).unwrap());
        (temp, validator)
    }

    #[test]
    fn test_allows_relative_paths_inside_project() {
        let (_temp, validator) = sample_project();
        let root = validator.root().as_path().to_path_buf();

        assert_eq!(
            validator.validate("app/models/user.rb"),
            ValidationOutcome::Allowed(root.join("app/models/user.rb"))
        );
        assert!(validator.validate("config/routes.rb").is_allowed());
        assert!(validator.validate("lib/tasks/something.rake").is_allowed());
    }

    #[test]
    fn test_denies_traversal() {
        let (_temp, validator) = sample_project();
        for path in ["../etc/passwd", "app/../../etc/passwd", "app/../../../etc/passwd"] {
            assert_eq!(validator.validate(path), ValidationOutcome::DeniedOutsideRoot, "{}", path);
        }
    }

    #[test]
    fn test_denies_absolute_paths_outside_project() {
        let (_temp, validator) = sample_project();
        assert_eq!(validator.validate("/etc/passwd"), ValidationOutcome::DeniedOutsideRoot);
        assert_eq!(
            validator.validate("/tmp/other_project/file.rb"),
            ValidationOutcome::DeniedOutsideRoot
        );
    }

    #[test]
    fn test_allows_absolute_paths_inside_project() {
        let (_temp, validator) = sample_project();
        let absolute = validator.root().as_path().join("config/routes.rb");
        assert!(validator.validate(&absolute.to_string_lossy()).is_allowed());
    }

    #[test]
    fn test_denies_root_itself() {
        let (_temp, validator) = sample_project();
        let root = validator.root().to_string();
        for path in [".", "./", "..", "app/..", root.as_str(), ""] {
            assert_eq!(validator.validate(path), ValidationOutcome::DeniedOutsideRoot, "{:?}", path);
        }
    }

    #[test]
    fn test_denies_sensitive_files() {
        let (_temp, validator) = sample_project();
        assert_eq!(
            validator.validate(".env"),
            ValidationOutcome::DeniedSensitive(r"\.env(\..*)?$".to_string())
        );
        assert!(matches!(
            validator.validate("config/master.key"),
            ValidationOutcome::DeniedSensitive(_)
        ));
        assert!(matches!(
            validator.validate("config/credentials.yml.enc"),
            ValidationOutcome::DeniedSensitive(_)
        ));
        assert!(matches!(
            validator.validate("app/../.ENV.production"),
            ValidationOutcome::DeniedSensitive(_)
        ));
    }

    #[test]
    fn test_denies_ignored_files() {
        let (_temp, validator) = sample_project();
        assert!(matches!(
            validator.validate("log/development.log"),
            ValidationOutcome::DeniedSensitive(_)
        ));
        assert!(matches!(
            validator.validate("db/Development.SQLITE3"),
            ValidationOutcome::DeniedSensitive(_)
        ));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let (_temp, validator) = sample_project();
        for path in ["app/models/user.rb", "app/x/../models/user.rb", ".env", "../x", "missing.rb"] {
            assert_eq!(validator.validate(path), validator.validate(path));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_sensitive_file_is_denied() {
        let (_temp, validator) = sample_project();
        let root = validator.root().as_path();
        std::os::unix::fs::symlink(root.join(".env"), root.join("notes.txt")).unwrap();

        assert!(matches!(
            validator.validate("notes.txt"),
            ValidationOutcome::DeniedSensitive(_)
        ));
    }

    #[test]
    fn test_check_maps_denials_to_errors() {
        let (_temp, validator) = sample_project();

        assert!(matches!(validator.check(""), Err(SecurityError::EmptyPath)));
        assert!(matches!(
            validator.check("../secret"),
            Err(SecurityError::PathOutsideRoot { .. })
        ));
        match validator.check("config/../config/master.key") {
            Err(SecurityError::SensitivePath { relative, .. }) => {
                assert_eq!(relative, "config/master.key");
            }
            other => panic!("expected sensitive path error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_path_collaborator() {
        let (temp, _validator) = sample_project();
        let root = std::fs::canonicalize(temp.path()).unwrap();

        let resolved = validate_path("app/models/user.rb", temp.path()).unwrap();
        assert_eq!(resolved, root.join("app/models/user.rb"));
        assert!(validate_path(".env", temp.path()).is_err());
        assert!(validate_path("../etc/passwd", temp.path()).is_err());
    }

    #[test]
    fn test_filter_sensitive_removes_sensitive_entries() {
        let (temp, validator) = sample_project();
        let root = validator.root().as_path();
        let files = vec![
            root.join("app/models/user.rb"),
            root.join(".env"),
            root.join("config/master.key"),
            root.join("config/routes.rb"),
            PathBuf::from("/etc/passwd"),
        ];

        let result = filter_sensitive(&files, temp.path());
        assert_eq!(
            result,
            vec![root.join("app/models/user.rb"), root.join("config/routes.rb")]
        );
    }

    #[test]
    fn test_filter_sensitive_accepts_relative_entries() {
        let (temp, _validator) = sample_project();
        let result = filter_sensitive(["Gemfile", ".env", "config/routes.rb"], temp.path());
        assert_eq!(result, vec![PathBuf::from("Gemfile"), PathBuf::from("config/routes.rb")]);
    }
}
