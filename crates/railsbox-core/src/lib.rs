//! # railsbox-core
//!
//! Access rules shared by every railsbox crate.
//!
//! - **Guard**: project-root canonicalization, the sensitive-file registry,
//!   `.gitignore` translation and the path validator built from them
//! - **Safety**: the forbidden-construct scanner that pre-screens script text
//! - **Configuration**: loading and validation of the json5 config file
//! - **Utilities**: config directory resolution and environment helpers

pub mod config;
pub mod env;
pub mod error;
pub mod guard;
pub mod paths;
pub mod safety;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result, SecurityError};
pub use guard::{
    filter_sensitive, valid_identifier, valid_table_name, validate_path, PathValidator,
    ProjectRoot, SensitivePatternRegistry, ValidationOutcome,
};
pub use safety::{ConstructCategory, ForbiddenConstructScanner, ForbiddenMatch};
