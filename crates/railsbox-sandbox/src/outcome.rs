//! Execution results and their user-visible rendering.
//!
//! Every request ends in exactly one text response. Each error class has its
//! own prefix so callers can branch on the first token without parsing prose.

use railsbox_core::ForbiddenMatch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response used when a script completes without printing anything.
pub const NO_OUTPUT_MESSAGE: &str = "Code executed successfully (no output).

Hint: Use `print` to see results, e.g.:
  print(read_file(\"config/routes.rb\"));
";

/// Kind of a mediator violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The path resolved outside the project root.
    PathViolation,
    /// The path matched a sensitive pattern.
    SensitiveFileViolation,
    /// A mutation or process operation was attempted.
    WriteViolation,
}

impl ViolationKind {
    /// Response prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::PathViolation => "PATH ERROR",
            Self::SensitiveFileViolation => "ACCESS DENIED",
            Self::WriteViolation => "WRITE ERROR",
        }
    }

    /// Type name shown to scripts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PathViolation => "PathViolation",
            Self::SensitiveFileViolation => "SensitiveFileViolation",
            Self::WriteViolation => "WriteViolation",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed rejection raised by the access mediator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn path(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::PathViolation, message)
    }

    pub fn sensitive(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::SensitiveFileViolation, message)
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::WriteViolation, message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of running admitted script text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Captured output, non-empty.
    Output(String),
    /// The script completed without output.
    NoOutput,
    /// The mediator denied an operation.
    Violation(Violation),
    /// The worker was killed at the deadline.
    Timeout(u64),
    /// Any other failure, reduced to a class and message.
    RuntimeError { class: String, message: String },
}

impl ExecutionResult {
    /// Build a result from captured output.
    pub fn from_output(output: String) -> Self {
        if output.is_empty() {
            Self::NoOutput
        } else {
            Self::Output(output)
        }
    }

    /// Build a runtime error.
    pub fn runtime_error(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuntimeError {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Terminal state reached by this result.
    pub fn state(&self) -> ExecutionState {
        match self {
            Self::Output(_) | Self::NoOutput => ExecutionState::Completed,
            Self::Timeout(_) => ExecutionState::TimedOut,
            Self::Violation(_) | Self::RuntimeError { .. } => ExecutionState::Faulted,
        }
    }

    /// The single text response for this result.
    pub fn render(&self) -> String {
        match self {
            Self::Output(text) => text.clone(),
            Self::NoOutput => NO_OUTPUT_MESSAGE.to_string(),
            Self::Violation(v) => format!("{}: {}", v.kind.prefix(), v.message),
            Self::Timeout(secs) => format!("TIMEOUT: Execution exceeded {} seconds", secs),
            Self::RuntimeError { class, message } => format!("ERROR: {} - {}", class, message),
        }
    }
}

/// Final outcome of a request, including pre-execution rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The scanner rejected the text; nothing ran.
    Rejected(ForbiddenMatch),
    /// The text ran in a worker.
    Finished(ExecutionResult),
}

impl ExecutionOutcome {
    /// Terminal state reached by this outcome.
    pub fn state(&self) -> ExecutionState {
        match self {
            Self::Rejected(_) => ExecutionState::Rejected,
            Self::Finished(result) => result.state(),
        }
    }

    /// The single text response for this outcome.
    pub fn render(&self) -> String {
        match self {
            Self::Rejected(m) => format!(
                "{}: REJECTED - code contains a forbidden construct ({}). \
                 Only read-only operations are permitted.",
                m.category.label(),
                m.description
            ),
            Self::Finished(result) => result.render(),
        }
    }
}

/// Pipeline states. `Rejected`, `Completed`, `TimedOut` and `Faulted` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Submitted,
    Scanning,
    Rejected,
    Sandboxed,
    Running,
    Completed,
    TimedOut,
    Faulted,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Completed | Self::TimedOut | Self::Faulted
        )
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submitted => "submitted",
            Self::Scanning => "scanning",
            Self::Rejected => "rejected",
            Self::Sandboxed => "sandboxed",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railsbox_core::ConstructCategory;

    #[test]
    fn test_render_prefixes() {
        let cases = [
            (
                ExecutionResult::Violation(Violation::path("Access denied: path '../x' is outside project directory")),
                "PATH ERROR: Access denied",
            ),
            (
                ExecutionResult::Violation(Violation::sensitive("Access denied: '.env' matches sensitive file pattern")),
                "ACCESS DENIED: Access denied: '.env'",
            ),
            (
                ExecutionResult::Violation(Violation::write("Write operations are not permitted: File::write")),
                "WRITE ERROR: Write operations",
            ),
            (ExecutionResult::Timeout(2), "TIMEOUT: Execution exceeded 2 seconds"),
            (
                ExecutionResult::runtime_error("NameError", "Variable not found: x"),
                "ERROR: NameError - Variable not found: x",
            ),
        ];

        for (result, prefix) in cases {
            assert!(result.render().starts_with(prefix), "{}", result.render());
        }
    }

    #[test]
    fn test_empty_output_is_no_output() {
        assert_eq!(ExecutionResult::from_output(String::new()), ExecutionResult::NoOutput);
        assert_eq!(ExecutionResult::NoOutput.render(), NO_OUTPUT_MESSAGE);
        assert_eq!(
            ExecutionResult::from_output("hi\n".to_string()).render(),
            "hi\n"
        );
    }

    #[test]
    fn test_rejection_names_category() {
        let outcome = ExecutionOutcome::Rejected(ForbiddenMatch {
            category: ConstructCategory::ProcessExec,
            description: "backtick command substitution".to_string(),
        });
        let text = outcome.render();
        assert!(text.starts_with("process-exec: REJECTED"));
        assert!(text.contains("backtick command substitution"));
        assert_eq!(outcome.state(), ExecutionState::Rejected);
    }

    #[test]
    fn test_terminal_states() {
        assert_eq!(ExecutionResult::NoOutput.state(), ExecutionState::Completed);
        assert_eq!(ExecutionResult::Timeout(1).state(), ExecutionState::TimedOut);
        assert_eq!(
            ExecutionResult::Violation(Violation::write("x")).state(),
            ExecutionState::Faulted
        );
        assert!(ExecutionState::Rejected.is_terminal());
        assert!(!ExecutionState::Running.is_terminal());
        assert!(!ExecutionState::Sandboxed.is_terminal());
    }

    #[test]
    fn test_violation_kind_serde() {
        let json = serde_json::to_string(&ViolationKind::SensitiveFileViolation).unwrap();
        assert_eq!(json, "\"sensitive_file_violation\"");
    }
}
