//! Path resolution utilities.

use crate::env;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the railsbox config directory.
///
/// `$RAILSBOX_HOME` wins; otherwise `$XDG_CONFIG_HOME/railsbox`, falling back to
/// `~/.config/railsbox`.
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(env::vars::RAILSBOX_HOME) {
        return Ok(expand_tilde(&home));
    }

    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .ok_or_else(|| {
            ConfigError::Validation("Could not determine home directory".to_string())
        })?;
    Ok(config_dir.join("railsbox"))
}

/// Get the main config file path (`<base_dir>/railsbox.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("railsbox.json5"))
}

/// Resolve the config file to use: an explicit path, then `$RAILSBOX_CONFIG`,
/// then the default location.
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env::get_var(env::vars::RAILSBOX_CONFIG) {
        return Ok(expand_tilde(&path));
    }
    config_file()
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
