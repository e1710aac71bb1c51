//! In-process wallet providers.
//!
//! Both providers simulate their wallet counterpart: the wallet side is
//! driven through `approve` / `reject` / `disconnect`, or automatically by a
//! [`PairingBehaviour`].

pub mod extension;
pub mod relay;

pub use extension::ExtensionProvider;
pub use relay::{normalize_account, RelayPairing, RelayProvider};

/// How the simulated wallet answers a pairing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PairingBehaviour {
    /// Approve right away with these accounts.
    AutoApprove(Vec<String>),
    /// Decline the request.
    Reject,
    /// Leave it pending until the wallet side is driven by hand.
    Manual,
    /// Let the request lapse.
    Expire,
}
