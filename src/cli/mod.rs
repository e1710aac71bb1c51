pub mod app;
pub mod catalog;
pub mod check;
pub mod commands;
pub mod connect;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod runtime;
pub mod settings;

pub use catalog::{cmd_catalog, CatalogArgs};
pub use check::{cmd_check, CheckArgs};
pub use connect::{cmd_connect, ConnectArgs, Scenario};
pub use settings::cmd_settings;
