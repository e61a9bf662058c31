//! CLI command implementations.

pub mod check;
pub mod config;
pub mod exec;
pub mod scan;

use clap::Args;
use std::io::Read;
use std::path::PathBuf;

/// Where script text comes from: `--code`, a file, or stdin (`-` or nothing).
#[derive(Args, Debug, Default)]
pub struct CodeSource {
    /// Script text
    #[arg(long, conflicts_with = "file")]
    pub code: Option<String>,

    /// Script file, or `-` for stdin
    pub file: Option<PathBuf>,
}

impl CodeSource {
    /// Read the script text.
    pub fn read(&self) -> anyhow::Result<String> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        match &self.file {
            Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
            _ => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Ok(text)
            }
        }
    }
}
