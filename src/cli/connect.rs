use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use wattgrid_core_types::ProviderKind;
use wattgrid_identity_binder::SessionView;
use wattgrid_identity_store::AccessDecision;
use wattgrid_wallet_connect::{ConnectError, ConnectionSnapshot, PairingBehaviour};

use super::context::CliContext;
use super::output::emit;
use crate::app_context::ContextOptions;

/// How the simulated wallet answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Approve,
    Reject,
    /// Never answer; the pairing timeout decides.
    Silent,
    Expire,
}

impl Scenario {
    pub fn behaviour(self, account: &str) -> PairingBehaviour {
        match self {
            Scenario::Approve => PairingBehaviour::AutoApprove(vec![account.to_string()]),
            Scenario::Reject => PairingBehaviour::Reject,
            Scenario::Silent => PairingBehaviour::Manual,
            Scenario::Expire => PairingBehaviour::Expire,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct ConnectArgs {
    /// Primary provider (extension or relay)
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Pretend no wallet extension is installed
    #[arg(long)]
    pub no_extension: bool,

    #[arg(long, value_enum, default_value = "approve")]
    pub scenario: Scenario,

    /// Account the wallet approves with
    #[arg(long, default_value = "0.0.4821")]
    pub account: String,

    /// Permission to evaluate once connected, as action:resource (repeatable)
    #[arg(long = "check", value_name = "ACTION:RESOURCE")]
    pub checks: Vec<String>,

    /// Disconnect afterwards and report the signed-out session too
    #[arg(long)]
    pub disconnect: bool,
}

#[derive(Serialize)]
struct CheckLine {
    action: String,
    resource: String,
    allowed: bool,
    decision: AccessDecision,
}

#[derive(Serialize)]
struct ConnectReport {
    connected: bool,
    error: Option<ConnectError>,
    message: Option<&'static str>,
    connection: ConnectionSnapshot,
    session: SessionView,
    checks: Vec<CheckLine>,
    after_disconnect: Option<SessionView>,
}

pub async fn cmd_connect(args: ConnectArgs, ctx: &CliContext) -> Result<()> {
    let checks = parse_checks(&args.checks)?;

    let mut settings = ctx.settings().clone();
    if let Some(provider) = args.provider {
        if provider == ProviderKind::Degraded {
            bail!("degraded mode is a fallback, not a selectable provider");
        }
        settings.providers.primary = provider;
    }

    let app = ctx.app_context_with(
        settings,
        ContextOptions {
            behaviour: args.scenario.behaviour(&args.account),
            extension_installed: !args.no_extension,
            ..ContextOptions::default()
        },
    )?;
    let orchestrator = app.orchestrator();
    let binder = app.binder();

    let result = orchestrator.connect().await;
    binder.drain();

    if let Some(pairing) = app.relay().pairing() {
        eprintln!("Relay pairing offer: {}", pairing.uri);
    }

    let error = result.err();
    let checks = checks
        .into_iter()
        .map(|(action, resource)| {
            let decision = binder.decide(&action, &resource);
            CheckLine {
                allowed: decision.is_allowed(),
                action,
                resource,
                decision,
            }
        })
        .collect();

    let mut report = ConnectReport {
        connected: orchestrator.snapshot().is_connected(),
        message: error.as_ref().map(ConnectError::user_message),
        error,
        connection: orchestrator.snapshot(),
        session: binder.view(),
        checks,
        after_disconnect: None,
    };

    if args.disconnect && orchestrator.disconnect().await {
        binder.drain();
        report.after_disconnect = Some(binder.view());
    }

    emit(ctx.output(), &report, print_report)
}

fn parse_checks(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| match entry.split_once(':') {
            Some((action, resource)) if !action.is_empty() && !resource.is_empty() => {
                Ok((action.to_string(), resource.to_string()))
            }
            _ => bail!("invalid --check '{entry}', expected action:resource"),
        })
        .collect()
}

fn print_report(report: &ConnectReport) {
    let conn = &report.connection;
    println!("Connection: {}", conn.state);
    if let Some(provider) = conn.provider {
        println!("Provider: {provider}");
    }
    if let Some(account) = &conn.active_account_id {
        println!("Account: {account}");
    }
    if conn.degraded {
        println!("Mode: degraded (placeholder account)");
    }
    if let Some(warning) = &conn.warning {
        println!("Warning: {warning}");
    }
    if let Some(error) = &report.error {
        println!("Error: {error}");
    }
    if let Some(message) = report.message {
        println!("  {message}");
    }
    if conn.retry_available {
        println!("  Retry is available.");
    }

    println!();
    print_session("Session", &report.session);

    if !report.checks.is_empty() {
        println!();
        for check in &report.checks {
            let verdict = if check.allowed { "ALLOW" } else { "DENY " };
            println!("{verdict} {} {}", check.action, check.resource);
        }
    }

    if let Some(after) = &report.after_disconnect {
        println!();
        print_session("After disconnect", after);
    }
}

fn print_session(title: &str, session: &SessionView) {
    println!(
        "{title}: authenticated={} connection={}",
        session.is_authenticated, session.connection
    );
    if let Some(profile) = &session.profile {
        println!(
            "  {} role={} name={}",
            profile.wallet_address(),
            profile.role(),
            profile.display_name().unwrap_or("-")
        );
        println!("  permissions={}", profile.permissions().len());
    }
}
