use anyhow::Result;
use clap::Args;
use serde::Serialize;
use wattgrid_core_types::Role;
use wattgrid_permission_catalog::Permission;

use super::context::CliContext;
use super::output::emit;
use crate::app_context::ContextOptions;

#[derive(Args, Clone, Debug)]
pub struct CatalogArgs {
    /// Only show this role (prosumer or viewer)
    #[arg(long)]
    pub role: Option<Role>,
}

#[derive(Serialize)]
struct RoleView {
    role: Role,
    label: &'static str,
    permissions: Vec<Permission>,
}

#[derive(Serialize)]
struct CatalogView {
    revision: u64,
    roles: Vec<RoleView>,
}

pub fn cmd_catalog(args: CatalogArgs, ctx: &CliContext) -> Result<()> {
    let app = ctx.app_context(ContextOptions::default())?;
    let catalog = app.store().catalog();
    let roles = match args.role {
        Some(role) => vec![role],
        None => Role::ALL.to_vec(),
    };
    let view = CatalogView {
        revision: catalog.revision(),
        roles: roles
            .into_iter()
            .map(|role| RoleView {
                role,
                label: role.label(),
                permissions: catalog.permissions_for(role),
            })
            .collect(),
    };

    emit(ctx.output(), &view, |view| {
        println!("Catalog revision: {}", view.revision);
        for role in &view.roles {
            println!();
            println!("{} ({})", role.label, role.role);
            for permission in &role.permissions {
                let verdict = if permission.allowed { "allow" } else { "deny " };
                println!(
                    "  {verdict}  {} {}",
                    permission.action, permission.resource
                );
            }
        }
    })
}
