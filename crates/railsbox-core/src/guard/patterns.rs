//! Sensitive file patterns.
//!
//! A path relative to the project root is sensitive when it matches any
//! pattern in the registry. The built-in set is always present; project rules
//! from `.gitignore` or configuration are unioned on top of it.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::gitignore;
use super::root::ProjectRoot;
use crate::error::SecurityError;

/// Built-in sensitive file patterns, matched case-insensitively.
pub const BUILTIN_PATTERNS: &[&str] = &[
    r"\.env(\..*)?$",              // .env, .env.local, .env.production
    r"\.key$",                     // private keys
    r"\.pem$",                     // certificates
    r"\.crt$",                     // certificates
    r"\.p12$",                     // PKCS12 bundles
    r"credentials\.yml(\.enc)?$",  // encrypted or plain credentials
    r"secrets\.yml(\.enc)?$",      // secrets store
    r"master\.key$",               // master key
    r"config/credentials",         // per-environment credentials directory
    r"config/secrets",             // secrets directory
    r"\.secret$",                  // generic secret files
    r"password",                   // anything named after a password
    r"(^|/)\.ssh(/|$)",            // SSH directory
    r"id_rsa",                     // SSH keys
    r"id_ed25519",                 // SSH keys
    r"id_ecdsa",                   // SSH keys
    r"(^|/)\.gnupg(/|$)",          // GPG directory
    r"\.netrc$",                   // netrc credentials
    r"\.pgpass$",                  // PostgreSQL passwords
    r"database\.yml$",             // database connection config
    r"storage\.yml$",              // storage service config, may hold keys
];

/// Directories skipped when walking a project tree.
pub const EXCLUDED_DIRECTORIES: &[&str] = &[
    ".git/",
    ".bundle/",
    "node_modules/",
    "vendor/bundle/",
    "vendor/cache/",
    "tmp/",
    "log/",
    "storage/",
    ".ruby-lsp/",
];

static BUILTIN: Lazy<Vec<SensitivePattern>> = Lazy::new(|| {
    BUILTIN_PATTERNS
        .iter()
        .map(|source| {
            SensitivePattern::new(source)
                .unwrap_or_else(|e| panic!("Invalid built-in sensitive pattern: {}", e))
        })
        .collect()
});

/// Check whether a root-relative path lives under an excluded directory.
pub fn is_excluded_directory(relative: &str) -> bool {
    let with_slash = format!("{}/", relative.trim_end_matches('/'));
    EXCLUDED_DIRECTORIES
        .iter()
        .any(|dir| with_slash.starts_with(dir))
}

/// A compiled, case-insensitive pattern plus the source it came from.
#[derive(Debug, Clone)]
pub struct SensitivePattern {
    source: String,
    regex: Regex,
}

impl SensitivePattern {
    /// Compile a pattern source.
    pub fn new(source: &str) -> Result<Self, SecurityError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| SecurityError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The regex source, for logs and denial messages.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check a root-relative path against this pattern.
    pub fn is_match(&self, relative: &str) -> bool {
        self.regex.is_match(relative)
    }
}

/// The set of sensitive patterns used by one validator.
#[derive(Debug, Clone)]
pub struct SensitivePatternRegistry {
    patterns: Vec<SensitivePattern>,
}

impl SensitivePatternRegistry {
    /// Registry holding only the built-in patterns.
    pub fn builtin() -> Self {
        Self {
            patterns: BUILTIN.clone(),
        }
    }

    /// Built-in patterns plus the rules derived from `<root>/.gitignore`.
    ///
    /// A missing or unreadable ignore file leaves the built-in set untouched.
    pub fn for_project(root: &ProjectRoot) -> Self {
        let mut registry = Self::builtin();
        let ignore_file = root.as_path().join(".gitignore");

        match std::fs::read_to_string(&ignore_file) {
            Ok(content) => registry.extend_from_gitignore(content.lines()),
            Err(e) => debug!("No ignore rules loaded from {:?}: {}", ignore_file, e),
        }

        registry
    }

    /// Compile ignore-file lines and add them to the registry.
    ///
    /// Lines whose translation does not compile are skipped with a warning.
    pub fn extend_from_gitignore<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) {
        for source in gitignore::compile(lines) {
            if let Err(e) = self.add(&source) {
                warn!("Skipping ignore rule: {}", e);
            }
        }
    }

    /// Add a single pattern source. Duplicate sources are ignored.
    pub fn add(&mut self, source: &str) -> Result<(), SecurityError> {
        if self.contains_source(source) {
            return Ok(());
        }
        self.patterns.push(SensitivePattern::new(source)?);
        Ok(())
    }

    /// Add several pattern sources, stopping at the first invalid one.
    pub fn extend<S: AsRef<str>>(
        &mut self,
        sources: impl IntoIterator<Item = S>,
    ) -> Result<(), SecurityError> {
        for source in sources {
            self.add(source.as_ref())?;
        }
        Ok(())
    }

    /// First pattern matching a root-relative path.
    pub fn find_match(&self, relative: &str) -> Option<&SensitivePattern> {
        self.patterns.iter().find(|p| p.is_match(relative))
    }

    /// Check whether a root-relative path is sensitive.
    pub fn is_sensitive(&self, relative: &str) -> bool {
        self.find_match(relative).is_some()
    }

    /// Check whether a pattern source is already registered.
    pub fn contains_source(&self, source: &str) -> bool {
        self.patterns.iter().any(|p| p.source == source)
    }

    /// Iterate over the registered patterns.
    pub fn iter(&self) -> impl Iterator<Item = &SensitivePattern> {
        self.patterns.iter()
    }

    /// Number of registered patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the registry is empty. Never true for registries built here.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for SensitivePatternRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
