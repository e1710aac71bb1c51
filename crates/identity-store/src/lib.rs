//! Wallet identity registry and the authorization queries built on it.
//!
//! The store owns every [`IdentityProfile`]; callers only ever receive copies.
//! Lookups that miss degrade to `None` (store) or deny (authorization), never
//! to an error.

pub mod authz;
pub mod clock;
pub mod errors;
pub mod store;

pub use authz::{AccessDecision, AuthorizationEngine, DecisionKind, DenyReason};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::StoreError;
pub use store::{IdentityProfile, IdentityStore};
