//! Path access rules for a single project tree.
//!
//! Every file a railsbox tool touches is resolved through this module:
//!
//! - [`canonicalize`]: lexical + symlink resolution against a project root
//! - [`SensitivePatternRegistry`]: built-in secret-file rules plus rules derived
//!   from the project's `.gitignore`
//! - [`gitignore`]: glob-line to regex translation feeding the registry
//! - [`PathValidator`]: the allow / deny-outside-root / deny-sensitive decision
//! - [`valid_identifier`] / [`valid_table_name`]: guards for identifiers that get
//!   interpolated into generated code or commands

mod canonical;
pub mod gitignore;
mod identifiers;
mod patterns;
mod root;
mod validator;

pub use canonical::{canonicalize, normalize_lexically};
pub use identifiers::{valid_identifier, valid_table_name};
pub use patterns::{
    is_excluded_directory, SensitivePattern, SensitivePatternRegistry, BUILTIN_PATTERNS,
    EXCLUDED_DIRECTORIES,
};
pub use root::ProjectRoot;
pub use validator::{filter_sensitive, validate, validate_path, PathValidator, ValidationOutcome};
