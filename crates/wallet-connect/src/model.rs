use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wattgrid_core_types::{ProviderKind, WalletAddress};

use crate::errors::ConnectError;

/// Phase of the wallet pairing handshake.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl ConnectionState {
    /// Transition table. Everything not listed is rejected by the
    /// orchestrator.
    pub fn can_transition(self, to: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, to),
            (Idle | Error | Disconnected, Connecting)
                | (Connecting, Connected | Error | Idle)
                | (Connected, Disconnected)
                | (Error, Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the UI needs to render the connect button area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub attempt_count: u32,
    pub last_error: Option<ConnectError>,
    pub active_account_id: Option<WalletAddress>,
    pub provider: Option<ProviderKind>,
    /// Connected through the placeholder identity rather than a wallet.
    pub degraded: bool,
    /// Non-fatal problem shown next to a working connection.
    pub warning: Option<ConnectError>,
    pub status_message: Option<String>,
    pub connecting_since: Option<DateTime<Utc>>,
    /// The failed attempt stayed in `connecting` past the display delay.
    pub extended: bool,
    pub retry_available: bool,
}

impl ConnectionSnapshot {
    pub fn idle() -> Self {
        Self {
            state: ConnectionState::Idle,
            attempt_count: 0,
            last_error: None,
            active_account_id: None,
            provider: None,
            degraded: false,
            warning: None,
            status_message: None,
            connecting_since: None,
            extended: false,
            retry_available: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.state == ConnectionState::Connecting
    }
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// What triggered a published event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    ConnectRequested,
    Paired,
    ProviderFailed,
    TimedOut,
    DegradedFallback,
    DisconnectRequested,
    ProviderDisconnected,
    Reset,
    StatusChanged,
}

/// One applied transition (or status update), in application order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub seq: u64,
    pub from: ConnectionState,
    pub cause: TransitionCause,
    pub snapshot: ConnectionSnapshot,
    pub recorded_at: DateTime<Utc>,
}

impl ConnectionEvent {
    pub fn to(&self) -> ConnectionState {
        self.snapshot.state
    }

    /// True when this event moved the machine into `state` from elsewhere.
    pub fn entered(&self, state: ConnectionState) -> bool {
        self.from != state && self.snapshot.state == state
    }
}

/// Result of a connect request that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected {
        account: WalletAddress,
        provider: ProviderKind,
        degraded: bool,
    },
    /// A connect was requested while already connected.
    AlreadyConnected(WalletAddress),
    /// Another attempt is in flight; this request was a no-op.
    InProgress,
    /// The attempt was reset to idle before the provider answered.
    Reset,
}

impl ConnectOutcome {
    pub fn account(&self) -> Option<&WalletAddress> {
        match self {
            ConnectOutcome::Connected { account, .. } | ConnectOutcome::AlreadyConnected(account) => {
                Some(account)
            }
            ConnectOutcome::InProgress | ConnectOutcome::Reset => None,
        }
    }
}
