//! Configuration management commands.

use clap::Args;
use railsbox_core::config::Config;
use railsbox_core::error::ConfigError;
use railsbox_core::paths;
use std::path::Path;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

/// Run the config command.
pub fn run(
    args: ConfigArgs,
    explicit: Option<&Path>,
    loaded: Result<Config, ConfigError>,
) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = loaded?;
            println!("{}", config.to_json5()?);
        }

        ConfigCommand::Path => {
            let path = paths::resolve_config_file(explicit)?;
            println!("{}", path.display());
        }

        ConfigCommand::Validate => match loaded {
            Ok(_) => println!("Configuration is valid"),
            Err(e) => anyhow::bail!("Configuration error: {}", e),
        },
    }

    Ok(())
}
