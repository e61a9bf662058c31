//! Run a script through the full pipeline.

use clap::Args;
use railsbox_core::config::Config;
use railsbox_core::ProjectRoot;
use railsbox_sandbox::{ExecutionRequest, Sandbox};
use std::path::PathBuf;

use super::CodeSource;

/// Exec command arguments.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Project root
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Timeout in seconds, clamped to the configured range
    #[arg(long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    #[command(flatten)]
    pub source: CodeSource,
}

/// Run the exec command. The rendered response always goes to stdout.
pub async fn run(args: ExecArgs, config: &Config) -> anyhow::Result<()> {
    let code = args.source.read()?;
    let root = ProjectRoot::new(&args.root)?;
    let sandbox = Sandbox::from_config(root, config)?;

    let mut request = ExecutionRequest::new(code);
    request.timeout = args.timeout;

    let outcome = sandbox.execute(request).await;
    let text = outcome.render();
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
    Ok(())
}
