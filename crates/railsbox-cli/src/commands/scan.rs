//! Pre-screen script text without running it.

use clap::Args;
use railsbox_core::ForbiddenConstructScanner;

use super::CodeSource;

/// Scan command arguments.
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub source: CodeSource,
}

/// One-line verdict for script text.
pub fn verdict(scanner: &ForbiddenConstructScanner, code: &str) -> String {
    match scanner.scan(code) {
        Some(found) => format!("{}: {}", found.category, found.description),
        None => "clean".to_string(),
    }
}

/// Run the scan command.
pub fn run(args: ScanArgs) -> anyhow::Result<()> {
    let code = args.source.read()?;
    println!("{}", verdict(&ForbiddenConstructScanner::default(), &code));
    Ok(())
}
