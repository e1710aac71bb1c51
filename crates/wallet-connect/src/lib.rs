//! Wallet connection lifecycle.
//!
//! [`ConnectionOrchestrator`] owns the connection state machine and drives
//! one or two [`ConnectionProvider`]s through the pairing handshake. When no
//! provider can run it falls back to a degraded, placeholder-account
//! connection so the dashboard stays usable.

pub mod errors;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod providers;

pub use errors::{classify, ConnectError, ErrorKind, ProviderError, USER_REJECTED_CODE};
pub use model::{
    ConnectOutcome, ConnectionEvent, ConnectionSnapshot, ConnectionState, TransitionCause,
};
pub use orchestrator::{ConnectionOrchestrator, OrchestratorConfig, DEGRADED_ACCOUNT_ID};
pub use provider::{ConnectionProvider, ProviderSignal, SignalSink};
pub use providers::{
    normalize_account, ExtensionProvider, PairingBehaviour, RelayPairing, RelayProvider,
};
