use serde::Serialize;
use wattgrid_identity_store::IdentityProfile;
use wattgrid_wallet_connect::ConnectionState;

/// What the UI layer reads: the bound profile and whether it counts as
/// signed in.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub profile: Option<IdentityProfile>,
    /// `connected` and a profile is present. Never true from connection
    /// state alone.
    pub is_authenticated: bool,
    pub connection: ConnectionState,
    pub degraded: bool,
    /// Sequence number of the connection event this view reflects.
    pub seq: u64,
}

impl SessionView {
    pub fn signed_out(connection: ConnectionState, seq: u64) -> Self {
        Self {
            profile: None,
            is_authenticated: false,
            connection,
            degraded: false,
            seq,
        }
    }

    pub fn signed_in(profile: IdentityProfile, degraded: bool, seq: u64) -> Self {
        Self {
            profile: Some(profile),
            is_authenticated: true,
            connection: ConnectionState::Connected,
            degraded,
            seq,
        }
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self::signed_out(ConnectionState::Idle, 0)
    }
}
