//! railsbox command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use railsbox_core::config::{Config, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// railsbox - read-only script execution for Rails projects
#[derive(Parser)]
#[command(name = "railsbox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "RAILSBOX_CONFIG", global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a read-only script against a project
    Exec(commands::exec::ExecArgs),

    /// Check paths and identifiers against the access rules
    Check(commands::check::CheckArgs),

    /// Scan script text for forbidden constructs without running it
    Scan(commands::scan::ScanArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Worker entry point: one request on stdin, one report on stdout
    #[command(hide = true)]
    Worker,

    /// Show version information
    Version,
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v` and the config.
pub fn init_logging(verbose: u8, config: Option<&LoggingConfig>, fallback: &str) {
    let level = match verbose {
        0 => config.map(|c| c.level.as_str()).unwrap_or(fallback),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("railsbox={}", level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.map(|c| c.json).unwrap_or(false) {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // The worker runs with a cleared environment and no config.
    if let Commands::Worker = cli.command {
        init_logging(cli.verbose, None, "warn");
        return Ok(railsbox_sandbox::serve_stdio()?);
    }

    let config = Config::load_from(cli.config.as_deref());
    init_logging(cli.verbose, config.as_ref().ok().map(|c| &c.logging), "info");

    match cli.command {
        Commands::Exec(args) => commands::exec::run(args, &config?).await,
        Commands::Check(args) => commands::check::run(args, &config?),
        Commands::Scan(args) => commands::scan::run(args),
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref(), config),
        Commands::Worker => Ok(()),
        Commands::Version => {
            println!("railsbox {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
