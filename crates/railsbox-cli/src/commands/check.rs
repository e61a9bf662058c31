//! Check paths and identifiers against the access rules.

use clap::{Args, Subcommand};
use railsbox_core::config::Config;
use railsbox_core::{valid_identifier, valid_table_name, PathValidator, ProjectRoot, ValidationOutcome};
use std::path::PathBuf;

/// Check command arguments.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(subcommand)]
    pub command: CheckCommand,
}

#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate paths against a project root
    Path {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Paths to check, relative to the root or absolute
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Check a constant or method name
    Identifier {
        /// Name to check
        name: String,
    },

    /// Check a table name
    Table {
        /// Name to check
        name: String,
    },
}

/// One line describing the decision for `path`.
pub fn describe(validator: &PathValidator, path: &str) -> String {
    match validator.validate(path) {
        ValidationOutcome::Allowed(canonical) => format!("ALLOWED {}", canonical.display()),
        ValidationOutcome::DeniedOutsideRoot => format!("DENIED outside-root {}", path),
        ValidationOutcome::DeniedSensitive(pattern) => {
            format!("DENIED sensitive ({}) {}", pattern, path)
        }
    }
}

fn validity(valid: bool) -> &'static str {
    if valid {
        "valid"
    } else {
        "invalid"
    }
}

/// Run the check command.
pub fn run(args: CheckArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        CheckCommand::Path { root, paths } => {
            let validator = config.path_validator(ProjectRoot::new(&root)?)?;
            for path in &paths {
                println!("{}", describe(&validator, path));
            }
        }
        CheckCommand::Identifier { name } => println!("{}", validity(valid_identifier(&name))),
        CheckCommand::Table { name } => println!("{}", validity(valid_table_name(&name))),
    }
    Ok(())
}
