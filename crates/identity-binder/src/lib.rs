//! Glue between the wallet connection and the identity store.
//!
//! [`IdentityBinder`] consumes the orchestrator's ordered transition stream,
//! provisions or refreshes the profile of the connected wallet and publishes
//! a [`SessionView`] for the UI layer.

pub mod assign;
pub mod binder;
pub mod view;

pub use assign::{assigner_for, AddressHashAssigner, FixedRole, RandomAssigner, RoleAssigner};
pub use binder::{IdentityBinder, DEGRADED_DISPLAY_NAME};
pub use view::SessionView;
