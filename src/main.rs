//! Command-line entry point: repairs each given file in turn.

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xmfix::{Cli, FixerSession};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.fixer_config();
    let mut failed = Vec::new();

    for file in &cli.files {
        let mut session = FixerSession::new(file, config.clone());
        match session.fix().await {
            Some(fixed) => {
                info!("Fixed {} -> {}", file.display(), fixed.display());
                println!("{}", fixed.display());
            }
            None => failed.push(file.display().to_string()),
        }
    }

    if !failed.is_empty() {
        bail!("failed to fix: {}", failed.join(", "));
    }
    Ok(())
}
