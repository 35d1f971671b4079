//! pathwatch CLI - pw command

use anyhow::Result;
use clap::Parser;
use cli_lib::{cmd, logging, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = logging::init(cli.log_file.as_deref(), cli.verbose)?;

    match &cli.command {
        Commands::File { path } => cmd::watch::run_file(&cli, path).await,
        Commands::Dir { path, depth } => cmd::watch::run_dir(&cli, path, *depth).await,
        Commands::Config => cmd::config::run_show(&cli),
    }
}
