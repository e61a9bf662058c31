//! Static pre-screening of submitted script text.
//!
//! The [`ForbiddenConstructScanner`] applies an ordered list of regex rules
//! to the raw text and reports the first match. It is a cheap fast-fail in
//! front of the sandbox, not the enforcement boundary: text that passes the
//! scan still runs with nothing but the mediator's read-only helpers.

pub mod scanner;

pub use scanner::{ForbiddenConstruct, ForbiddenConstructScanner, ForbiddenMatch};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a forbidden construct, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructCategory {
    /// File or directory mutation.
    Write,
    /// Process spawning and shell escapes.
    ProcessExec,
    /// Network clients and sockets.
    Network,
    /// Dynamic evaluation and metaprogramming.
    DynamicEval,
    /// Environment and credential store access.
    CredentialAccess,
    /// Loading code from a non-literal source.
    UnsafeLoad,
}

impl ConstructCategory {
    /// All categories in the order they are checked.
    pub const ALL: [ConstructCategory; 6] = [
        Self::Write,
        Self::ProcessExec,
        Self::Network,
        Self::DynamicEval,
        Self::CredentialAccess,
        Self::UnsafeLoad,
    ];

    /// Stable label used in rejection messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::ProcessExec => "process-exec",
            Self::Network => "network",
            Self::DynamicEval => "dynamic-eval",
            Self::CredentialAccess => "credential-access",
            Self::UnsafeLoad => "unsafe-load",
        }
    }
}

impl fmt::Display for ConstructCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
