mod cli;
mod commands;
mod reporter;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Keep guard alive until exit so buffered log lines are written
    let _log_guard = imageprov::util::init_logging(cli.global.log_dir.as_deref())?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &cli.global).await,
        Commands::Defaults(args) => commands::defaults::execute(args),
    }
}
