use super::catalog::cmd_catalog;
use super::check::cmd_check;
use super::connect::cmd_connect;
use super::env::CliArgs;
use super::settings::cmd_settings;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Catalog(args) => cmd_catalog(args, ctx),
        Commands::Connect(args) => cmd_connect(args, ctx).await,
        Commands::Check(args) => cmd_check(args, ctx),
        Commands::Settings => cmd_settings(ctx),
    }
}
