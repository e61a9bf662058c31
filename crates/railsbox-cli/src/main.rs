//! railsbox CLI entry point.

use clap::Parser;
use railsbox_cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging is initialized inside `run` once the config is known.
    let cli = Cli::parse();
    run(cli).await
}
