//! The worker side of the execution protocol.
//!
//! One request per process: a JSON [`WorkerRequest`] on stdin, one JSON
//! [`ScriptReport`] line on stdout. Every failure, including an unreadable
//! request, is reported in-band so the worker always exits 0.

use std::io::{Read, Write};
use std::path::PathBuf;

use railsbox_core::{Config, PathValidator, ProjectRoot, SensitivePatternRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{evaluate, EngineOptions, ScriptReport};
use crate::error::SandboxError;
use crate::hardening::{harden, HardeningOptions};
use crate::mediator::AccessMediator;
use crate::Result;

/// Per-request worker settings, carried over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerOptions {
    pub max_output_bytes: usize,
    pub max_operations: Option<u64>,
    pub landlock: bool,
    pub memory_limit_bytes: Option<u64>,
    pub use_gitignore: bool,
    pub extra_sensitive_patterns: Vec<String>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_output_bytes: EngineOptions::default().max_output_bytes,
            max_operations: None,
            landlock: true,
            memory_limit_bytes: None,
            use_gitignore: true,
            extra_sensitive_patterns: Vec::new(),
        }
    }
}

impl WorkerOptions {
    /// Options derived from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_output_bytes: config.execution.max_output_bytes,
            max_operations: config.worker.max_operations,
            landlock: config.worker.landlock,
            memory_limit_bytes: config.worker.memory_limit_bytes,
            use_gitignore: config.security.use_gitignore,
            extra_sensitive_patterns: config.security.extra_sensitive_patterns.clone(),
        }
    }

    fn engine(&self) -> EngineOptions {
        EngineOptions {
            max_output_bytes: self.max_output_bytes,
            max_operations: self.max_operations,
        }
    }

    fn hardening(&self) -> HardeningOptions {
        HardeningOptions {
            landlock: self.landlock,
            memory_limit_bytes: self.memory_limit_bytes,
        }
    }
}

/// What the host sends to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub root: PathBuf,
    pub script: String,
    #[serde(default)]
    pub options: WorkerOptions,
}

/// Build the mediator for a request, or the fault report explaining why not.
fn prepare(request: &WorkerRequest) -> std::result::Result<AccessMediator, ScriptReport> {
    let root = ProjectRoot::new(&request.root)
        .map_err(|e| ScriptReport::fault("SetupError", e.to_string()))?;

    let mut patterns = if request.options.use_gitignore {
        SensitivePatternRegistry::for_project(&root)
    } else {
        SensitivePatternRegistry::builtin()
    };
    patterns
        .extend(&request.options.extra_sensitive_patterns)
        .map_err(|e| ScriptReport::fault("SetupError", e.to_string()))?;

    Ok(AccessMediator::new(PathValidator::new(root, patterns)))
}

/// Run a request in the current process without hardening it.
pub fn run_script(request: &WorkerRequest) -> ScriptReport {
    match prepare(request) {
        Ok(mediator) => evaluate(mediator, &request.script, &request.options.engine()),
        Err(report) => report,
    }
}

/// Harden the current process, then run the request.
pub fn run_worker(request: &WorkerRequest) -> ScriptReport {
    let mediator = match prepare(request) {
        Ok(mediator) => mediator,
        Err(report) => return report,
    };
    harden(mediator.validator().root().as_path(), &request.options.hardening());
    evaluate(mediator, &request.script, &request.options.engine())
}

/// Read one request from `reader`, write one report line to `writer`.
pub fn serve<R: Read, W: Write>(mut reader: R, mut writer: W, hardened: bool) -> Result<()> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let report = match serde_json::from_str::<WorkerRequest>(&input) {
        Ok(request) if hardened => run_worker(&request),
        Ok(request) => run_script(&request),
        Err(e) => {
            debug!("Unreadable worker request: {}", e);
            ScriptReport::fault("ProtocolError", format!("Invalid worker request: {}", e))
        }
    };

    let line = serde_json::to_string(&report).map_err(|e| SandboxError::protocol(e.to_string()))?;
    writeln!(writer, "{}", line)?;
    writer.flush()?;
    Ok(())
}

/// Worker entry point: stdin to stdout, hardened.
pub fn serve_stdio() -> Result<()> {
    serve(std::io::stdin().lock(), std::io::stdout().lock(), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptStatus;
    use crate::outcome::ViolationKind;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("config")).unwrap();
        std::fs::create_dir_all(root.join("db")).unwrap();
        std::fs::write(
            root.join("config/routes.rb"),
            "Rails.application.routes.draw do\n  root 'home#index'\nend\n",
        )
        .unwrap();
        std::fs::write(root.join("db/schema.rb"), "create_table \"users\"\n").unwrap();
        std::fs::write(root.join("db/development.sqlite3"), "SQLite").unwrap();
        std::fs::write(root.join(".gitignore"), "*.sqlite3\n").unwrap();
        temp
    }

    fn request(temp: &TempDir, script: &str) -> WorkerRequest {
        WorkerRequest {
            root: temp.path().to_path_buf(),
            script: script.to_string(),
            options: WorkerOptions::default(),
        }
    }

    #[test]
    fn test_run_script_reads_routes() {
        let temp = fixture();
        let report = run_script(&request(&temp, r#"print(read_file("config/routes.rb"));"#));
        assert_eq!(report.status, ScriptStatus::Completed);
        assert!(report.output.contains("home#index"));
    }

    #[test]
    fn test_gitignore_rules_apply() {
        let temp = fixture();
        let report = run_script(&request(&temp, r#"read_file("db/development.sqlite3");"#));
        assert!(matches!(
            report.status,
            ScriptStatus::Violation(ref v) if v.kind == ViolationKind::SensitiveFileViolation
        ));

        let mut req = request(&temp, r#"print(read_file("db/development.sqlite3"));"#);
        req.options.use_gitignore = false;
        assert_eq!(run_script(&req).status, ScriptStatus::Completed);
    }

    #[test]
    fn test_extra_patterns_apply() {
        let temp = fixture();
        let mut req = request(&temp, r#"read_file("db/schema.rb");"#);
        req.options.extra_sensitive_patterns = vec![r"^db/".to_string()];
        assert!(matches!(run_script(&req).status, ScriptStatus::Violation(_)));
    }

    #[test]
    fn test_invalid_extra_pattern_is_setup_fault() {
        let temp = fixture();
        let mut req = request(&temp, "print(1);");
        req.options.extra_sensitive_patterns = vec!["([".to_string()];
        assert!(matches!(
            run_script(&req).status,
            ScriptStatus::Fault { ref class, .. } if class == "SetupError"
        ));
    }

    #[test]
    fn test_missing_root_is_setup_fault() {
        let req = WorkerRequest {
            root: PathBuf::from("/nonexistent/railsbox/project"),
            script: "print(1);".to_string(),
            options: WorkerOptions::default(),
        };
        assert!(matches!(
            run_script(&req).status,
            ScriptStatus::Fault { ref class, .. } if class == "SetupError"
        ));
    }

    #[test]
    fn test_request_options_default_when_absent() {
        let json = r#"{"root": "/srv/app", "script": "print(1);"}"#;
        let req: WorkerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.options, WorkerOptions::default());
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.execution.max_output_bytes = 4096;
        config.worker.landlock = false;
        config.worker.max_operations = Some(1_000_000);
        config.security.extra_sensitive_patterns = vec![r"\.dump$".to_string()];

        let options = WorkerOptions::from_config(&config);
        assert_eq!(options.max_output_bytes, 4096);
        assert!(!options.landlock);
        assert_eq!(options.max_operations, Some(1_000_000));
        assert_eq!(options.extra_sensitive_patterns, vec![r"\.dump$".to_string()]);
    }

    #[test]
    fn test_serve_writes_one_report_line() {
        let temp = fixture();
        let input = serde_json::to_string(&request(&temp, r#"print("hi");"#)).unwrap();
        let mut output = Vec::new();

        serve(Cursor::new(input), &mut output, false).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
        let report: ScriptReport = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(report.output, "hi\n");
        assert_eq!(report.status, ScriptStatus::Completed);
    }

    #[test]
    fn test_serve_reports_unreadable_request() {
        let mut output = Vec::new();
        serve(Cursor::new("not json"), &mut output, false).unwrap();

        let report: ScriptReport = serde_json::from_slice(&output).unwrap();
        assert!(matches!(
            report.status,
            ScriptStatus::Fault { ref class, .. } if class == "ProtocolError"
        ));
    }
}
