//! Environment variable handling.

use std::collections::HashMap;
use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Keep only the allowlisted variables from `env`.
pub fn filter_env(env: &HashMap<String, String>, allowlist: &[String]) -> HashMap<String, String> {
    env.iter()
        .filter(|(k, _)| allowlist.iter().any(|allowed| allowed == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Get the allowlisted subset of the current environment.
pub fn get_filtered_env(allowlist: &[String]) -> HashMap<String, String> {
    let current: HashMap<String, String> = env::vars().collect();
    filter_env(&current, allowlist)
}

/// Environment variable names read by railsbox.
pub mod vars {
    /// Config directory override.
    pub const RAILSBOX_HOME: &str = "RAILSBOX_HOME";

    /// Config file override.
    pub const RAILSBOX_CONFIG: &str = "RAILSBOX_CONFIG";

    /// Log level or filter directive.
    pub const RAILSBOX_LOG: &str = "RAILSBOX_LOG";

    /// Default execution timeout in seconds.
    pub const RAILSBOX_TIMEOUT: &str = "RAILSBOX_TIMEOUT";

    /// Maximum execution timeout in seconds.
    pub const RAILSBOX_MAX_TIMEOUT: &str = "RAILSBOX_MAX_TIMEOUT";

    /// Variables passed through to the worker process by default.
    pub const DEFAULT_WORKER_ENV: &[&str] = &["LANG", "LC_ALL", "RUST_LOG"];
}
