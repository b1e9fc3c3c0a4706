use anyhow::Context;
use clap::Args;
use imageprov::{GeneratedData, LocalExecutor, ProvisionConfig, ProvisionOptions, Provisioner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::reporter::ConsoleReporter;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Options file (YAML, or JSON with a .json extension)
    #[arg(long, short)]
    pub config: PathBuf,

    /// Build data available to templates, as KEY=VALUE
    #[arg(long = "data", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub data: Vec<(String, String)>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: RunArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let options = load_options(&args.config)?;
    let config = ProvisionConfig::resolve(options)
        .with_context(|| format!("invalid options in {}", args.config.display()))?;

    let data: GeneratedData = args.data.into_iter().collect();

    let cancel = CancellationToken::new();
    let provisioner = Provisioner::new(
        config,
        Arc::new(LocalExecutor::new()),
        Arc::new(ConsoleReporter::new(global.quiet)),
    )
    .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling provisioning");
            cancel.cancel();
        }
    });

    let report = provisioner
        .provision(&data)
        .await
        .context("provisioning failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !global.quiet {
        println!(
            "Provisioned {} script(s), {} reboot(s)",
            report.scripts.len(),
            report.reboots.len()
        );
    }
    Ok(())
}

/// Read options and resolve relative script paths against the file's directory.
fn load_options(path: &Path) -> anyhow::Result<ProvisionOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let mut options: ProvisionOptions = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?
    };

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    options.scripts = options
        .scripts
        .into_iter()
        .map(|script| {
            if script.is_relative() {
                base.join(script)
            } else {
                script
            }
        })
        .collect();

    Ok(options)
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
