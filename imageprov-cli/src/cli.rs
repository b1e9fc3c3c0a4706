use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{defaults::DefaultsArgs, run::RunArgs};

/// Provision machine images with PowerShell scripts.
#[derive(Parser, Debug)]
#[command(name = "imageprov", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run provisioning against the local machine
    Run(RunArgs),
    /// Print the built-in defaults for an OS type
    Defaults(DefaultsArgs),
}

#[derive(Args, Debug)]
pub struct GlobalFlags {
    /// Write logs to a daily-rolling file in this directory instead of stderr
    #[arg(long, global = true, env = "IMAGEPROV_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    pub quiet: bool,
}
