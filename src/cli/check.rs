use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use wattgrid_core_types::{Role, WalletAddress};
use wattgrid_identity_store::{AccessDecision, IdentityProfile};

use super::context::CliContext;
use super::output::emit;
use crate::app_context::ContextOptions;

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Wallet account id
    #[arg(long)]
    pub wallet: String,
    /// Role to register the wallet with
    #[arg(long, default_value = "prosumer")]
    pub role: Role,
    #[arg(long)]
    pub action: String,
    #[arg(long)]
    pub resource: String,
    #[arg(long)]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
struct CheckReport {
    profile: IdentityProfile,
    action: String,
    resource: String,
    allowed: bool,
    decision: AccessDecision,
}

pub fn cmd_check(args: CheckArgs, ctx: &CliContext) -> Result<()> {
    let wallet = WalletAddress::parse(args.wallet.as_str()).context("Invalid --wallet")?;
    let app = ctx.app_context(ContextOptions::default())?;

    let profile = app
        .store()
        .register(wallet.clone(), args.role, args.display_name.clone());
    let decision = app
        .authorization()
        .decide(&wallet, &args.action, &args.resource);

    let report = CheckReport {
        profile,
        allowed: decision.is_allowed(),
        action: args.action,
        resource: args.resource,
        decision,
    };
    emit(ctx.output(), &report, |report| {
        let verdict = if report.allowed { "ALLOW" } else { "DENY" };
        println!(
            "{verdict}: {} ({}) -> {} {}",
            report.profile.wallet_address(),
            report.profile.role(),
            report.action,
            report.resource
        );
        if let Some(reason) = report.decision.reason {
            println!("Reason: {reason:?}");
        }
    })
}
