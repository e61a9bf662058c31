//! Config save/load roundtrip integration tests.

use railsbox_core::config::{Config, ConfigBuilder, LogLevel};
use railsbox_core::ProjectRoot;
use railsbox_sandbox::{ExecutionLimits, WorkerOptions};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("railsbox.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.execution.default_timeout_secs, config.execution.default_timeout_secs);
    assert_eq!(loaded.execution.max_output_bytes, config.execution.max_output_bytes);
    assert_eq!(loaded.worker.env_allowlist, config.worker.env_allowlist);
    assert_eq!(loaded.security.use_gitignore, config.security.use_gitignore);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("railsbox.json5");

    let config = ConfigBuilder::new()
        .default_timeout(10)
        .timeout_bounds(2, 20)
        .sensitive_pattern(r"\.dump$")
        .log_level(LogLevel::Debug)
        .build_validated()
        .unwrap();
    config.save(&path).unwrap();

    let loaded = Config::load_from(Some(&path)).unwrap();
    assert_eq!(loaded.execution.default_timeout_secs, 10);
    assert_eq!(loaded.execution.min_timeout_secs, 2);
    assert_eq!(loaded.security.extra_sensitive_patterns, vec![r"\.dump$".to_string()]);
    assert_eq!(loaded.logging.level, LogLevel::Debug);
}

#[test]
fn test_handwritten_json5_with_comments() {
    let config = Config::parse(
        r#"{
            // tighter bounds for CI
            execution: { default_timeout_secs: 5, max_timeout_secs: 10 },
            worker: { landlock: false },
        }"#,
    )
    .unwrap();
    config.validate().unwrap();

    let limits = ExecutionLimits::from(&config.execution);
    assert_eq!(limits.clamp_timeout(None), 5);
    assert_eq!(limits.clamp_timeout(Some(99)), 10);
    assert!(!WorkerOptions::from_config(&config).landlock);
}

#[test]
fn test_configured_patterns_extend_builtins() {
    let project = railsbox_integration_tests::rails_project();
    let config = ConfigBuilder::new().sensitive_pattern(r"^db/schema\.rb$").build();
    let validator = config
        .path_validator(ProjectRoot::new(project.path()).unwrap())
        .unwrap();

    assert!(!validator.validate("db/schema.rb").is_allowed());
    assert!(!validator.validate(".env").is_allowed());
    assert!(validator.validate("config/routes.rb").is_allowed());
}

#[test]
fn test_config_load_explicit_nonexistent() {
    let result = Config::load_from(Some(Path::new("/nonexistent/railsbox.json5")));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    assert!(Config::parse("not valid json").is_err());
}
