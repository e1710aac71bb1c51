use clap::Subcommand;

use super::catalog::CatalogArgs;
use super::check::CheckArgs;
use super::connect::ConnectArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Print the role to permission catalog
    Catalog(CatalogArgs),

    /// Run a simulated wallet connection and show the resulting session
    Connect(ConnectArgs),

    /// Evaluate one permission for a wallet and role
    Check(CheckArgs),

    /// Show resolved settings and where each value came from
    Settings,
}
