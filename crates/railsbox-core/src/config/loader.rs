//! Configuration loading and persistence.

use super::{Config, LogLevel};
use crate::env;
use crate::error::{ConfigError, SecurityError};
use crate::guard::{PathValidator, ProjectRoot, SensitivePattern, SensitivePatternRegistry};
use crate::paths;
use std::fs;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Resolve the config file (explicit, `$RAILSBOX_CONFIG`, default), load
    /// it, apply environment overrides and validate.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse or validate is an error.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = paths::resolve_config_file(explicit)?;
        let mut config = match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(p)) if explicit.is_none() => {
                debug!("No config file at {:?}, using defaults", p);
                Self::default()
            }
            Err(e) => return Err(e),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `RAILSBOX_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env::get_var);
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(secs) = number(env::vars::RAILSBOX_TIMEOUT) {
            self.execution.default_timeout_secs = secs;
        }
        if let Some(secs) = number(env::vars::RAILSBOX_MAX_TIMEOUT) {
            self.execution.max_timeout_secs = secs;
        }
        if let Some(level) = lookup(env::vars::RAILSBOX_LOG) {
            match level.parse::<LogLevel>() {
                Ok(level) => self.logging.level = level,
                Err(e) => debug!("Ignoring {}: {}", env::vars::RAILSBOX_LOG, e),
            }
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let exec = &self.execution;

        // 1. Timeout bounds
        if exec.min_timeout_secs == 0 {
            errors.push("Minimum timeout must be at least 1 second".to_string());
        }
        if exec.min_timeout_secs > exec.max_timeout_secs {
            errors.push(format!(
                "Minimum timeout ({}) exceeds maximum timeout ({})",
                exec.min_timeout_secs, exec.max_timeout_secs
            ));
        }
        if exec.default_timeout_secs < exec.min_timeout_secs
            || exec.default_timeout_secs > exec.max_timeout_secs
        {
            errors.push(format!(
                "Default timeout {} is outside [{}, {}]",
                exec.default_timeout_secs, exec.min_timeout_secs, exec.max_timeout_secs
            ));
        }

        // 2. Output cap
        if exec.max_output_bytes == 0 {
            errors.push("Maximum output size must be greater than 0".to_string());
        }

        // 3. Worker limits
        if self.worker.max_operations == Some(0) {
            errors.push("Worker max_operations must be greater than 0".to_string());
        }
        if self.worker.memory_limit_bytes == Some(0) {
            errors.push("Worker memory_limit_bytes must be greater than 0".to_string());
        }

        // 4. Extra sensitive patterns must compile
        for source in &self.security.extra_sensitive_patterns {
            if let Err(e) = SensitivePattern::new(source) {
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Build the sensitive pattern set for a project: the built-ins, the
    /// project's ignore rules when enabled, and any configured extras.
    pub fn sensitive_patterns(
        &self,
        root: &ProjectRoot,
    ) -> Result<SensitivePatternRegistry, SecurityError> {
        let mut registry = if self.security.use_gitignore {
            SensitivePatternRegistry::for_project(root)
        } else {
            SensitivePatternRegistry::builtin()
        };
        registry.extend(&self.security.extra_sensitive_patterns)?;
        Ok(registry)
    }

    /// Build a path validator for a project under this configuration.
    pub fn path_validator(&self, root: ProjectRoot) -> Result<PathValidator, SecurityError> {
        let patterns = self.sensitive_patterns(&root)?;
        Ok(PathValidator::new(root, patterns))
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default timeout.
    pub fn default_timeout(mut self, secs: u64) -> Self {
        self.config.execution.default_timeout_secs = secs;
        self
    }

    /// Set the timeout clamp range.
    pub fn timeout_bounds(mut self, min_secs: u64, max_secs: u64) -> Self {
        self.config.execution.min_timeout_secs = min_secs;
        self.config.execution.max_timeout_secs = max_secs;
        self
    }

    /// Set the output cap.
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.config.execution.max_output_bytes = bytes;
        self
    }

    /// Set the worker executable.
    pub fn worker_program(mut self, program: impl Into<std::path::PathBuf>) -> Self {
        self.config.worker.program = Some(program.into());
        self
    }

    /// Enable or disable Landlock in the worker.
    pub fn landlock(mut self, enabled: bool) -> Self {
        self.config.worker.landlock = enabled;
        self
    }

    /// Set the worker address space limit.
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.config.worker.memory_limit_bytes = Some(bytes);
        self
    }

    /// Set the script engine operation budget.
    pub fn max_operations(mut self, ops: u64) -> Self {
        self.config.worker.max_operations = Some(ops);
        self
    }

    /// Enable or disable ignore-file patterns.
    pub fn use_gitignore(mut self, enabled: bool) -> Self {
        self.config.security.use_gitignore = enabled;
        self
    }

    /// Add an extra sensitive pattern.
    pub fn sensitive_pattern(mut self, source: impl Into<String>) -> Self {
        self.config.security.extra_sensitive_patterns.push(source.into());
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build the config.
    pub fn build(self) -> Config {
        self.config
    }

    /// Validate and build the config, returning an error if validation fails.
    pub fn build_validated(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
