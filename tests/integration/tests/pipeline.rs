//! Cross-crate pipeline tests: scanner, host, worker logic and access rules
//! working together against a fixture project.

use async_trait::async_trait;
use railsbox_core::{filter_sensitive, validate_path, ProjectRoot};
use railsbox_sandbox::worker::run_script;
use railsbox_sandbox::{
    ExecutionHost, ExecutionLimits, ExecutionRequest, ExecutionState, Sandbox, SandboxError,
    ScriptRunner, WorkerOptions, WorkerRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Runs the worker logic in-process, without hardening.
#[derive(Default)]
struct LocalRunner {
    calls: AtomicUsize,
}

#[async_trait]
impl ScriptRunner for LocalRunner {
    async fn execute_in_project(
        &self,
        root: &ProjectRoot,
        script: &str,
        _deadline: Duration,
    ) -> railsbox_sandbox::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let report = run_script(&WorkerRequest {
            root: root.as_path().to_path_buf(),
            script: script.to_string(),
            options: WorkerOptions::default(),
        });
        serde_json::to_string(&report).map_err(|e| SandboxError::protocol(e.to_string()))
    }
}

/// Never finishes in time.
struct StuckRunner;

#[async_trait]
impl ScriptRunner for StuckRunner {
    async fn execute_in_project(
        &self,
        _root: &ProjectRoot,
        _script: &str,
        deadline: Duration,
    ) -> railsbox_sandbox::Result<String> {
        Err(SandboxError::Timeout(deadline.as_secs()))
    }
}

fn sandbox(runner: Arc<dyn ScriptRunner>) -> (tempfile::TempDir, Sandbox) {
    let project = railsbox_integration_tests::rails_project();
    let root = ProjectRoot::new(project.path()).unwrap();
    let host = ExecutionHost::new(runner, ExecutionLimits::default());
    (project, Sandbox::new(root, host))
}

async fn render(sandbox: &Sandbox, code: &str) -> String {
    sandbox.execute(ExecutionRequest::new(code)).await.render()
}

#[tokio::test]
async fn test_listing_a_project() {
    let (_project, sandbox) = sandbox(Arc::new(LocalRunner::default()));
    let text = render(
        &sandbox,
        r#"
        for model in glob("app/models/*.rb") { print(model); }
        print(entries("config"));
        "#,
    )
    .await;

    assert!(text.contains("app/models/line_item.rb\napp/models/order.rb\n"), "{}", text);
    assert!(text.contains("application.rb"));
    assert!(text.contains("routes.rb"));
    assert!(!text.contains("master.key"));
    assert!(!text.contains("database.yml"));
    assert!(!text.contains("credentials"));
}

#[tokio::test]
async fn test_every_secret_is_denied() {
    let (_project, sandbox) = sandbox(Arc::new(LocalRunner::default()));
    for path in [
        ".env",
        ".env.production",
        "config/master.key",
        "config/credentials.yml.enc",
        "config/database.yml",
        "db/development.sqlite3",
        "log/development.log",
    ] {
        let text = render(&sandbox, &format!(r#"print(read_file("{}"));"#, path)).await;
        assert!(text.starts_with("ACCESS DENIED: "), "{} -> {}", path, text);
    }
}

#[tokio::test]
async fn test_escapes_are_path_errors() {
    let (_project, sandbox) = sandbox(Arc::new(LocalRunner::default()));
    for path in ["../secret", "app/../../secret", "/etc/passwd", "."] {
        let text = render(&sandbox, &format!(r#"print(read_file("{}"));"#, path)).await;
        assert!(text.starts_with("PATH ERROR: "), "{} -> {}", path, text);
    }
}

#[tokio::test]
async fn test_scanner_short_circuits() {
    let runner = Arc::new(LocalRunner::default());
    let (_project, sandbox) = sandbox(runner.clone());

    let outcome = sandbox
        .execute(ExecutionRequest::new(r#"FileUtils::rm_rf("app");"#))
        .await;
    assert_eq!(outcome.state(), ExecutionState::Rejected);
    assert!(outcome.render().starts_with("write: REJECTED"));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_deadline_expiry_renders_timeout() {
    let (_project, sandbox) = sandbox(Arc::new(StuckRunner));
    let outcome = sandbox
        .execute(ExecutionRequest::new("loop { }").with_timeout(3))
        .await;

    assert_eq!(outcome.state(), ExecutionState::TimedOut);
    assert_eq!(outcome.render(), "TIMEOUT: Execution exceeded 3 seconds");
}

#[test]
fn test_collaborator_helpers_agree_with_mediator() {
    let project = railsbox_integration_tests::rails_project();
    let root = project.path();

    assert!(validate_path("config/routes.rb", root).is_ok());
    assert!(validate_path(".env", root).is_err());

    let kept = filter_sensitive(["Gemfile", ".env", "config/master.key", "db/schema.rb"], root);
    let kept: Vec<String> = kept.iter().map(|p| p.display().to_string()).collect();
    assert_eq!(kept, vec!["Gemfile", "db/schema.rb"]);
}
