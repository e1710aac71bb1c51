use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_settings, settings_path};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;

    info!(
        "Starting wattgrid v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("WATTGRID_GIT_HASH"),
        env!("WATTGRID_BUILD_DATE")
    );

    let path = settings_path(cli.config.as_ref())?;
    let settings = load_settings(path.as_deref(), &cli.overrides)?;
    debug!(rev = settings.rev, "settings resolved");
    let cli_context = CliContext::new(settings, path, cli.output);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            debug!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
