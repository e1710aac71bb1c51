//! Wattgrid wallet and access core
//!
//! Exposes the application context and CLI modules for integration testing

pub mod app_context;
pub mod cli;

pub use app_context::{AppContext, ContextError, ContextOptions};
