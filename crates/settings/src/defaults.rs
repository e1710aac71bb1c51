use wattgrid_core_types::{ProviderKind, Role};

use crate::model::{
    AssignmentStrategy, ConnectionSettings, IdentitySettings, ProviderSettings, SettingsSnapshot,
};

/// Reserved account id identifying a degraded-mode connection.
pub const DEFAULT_DEGRADED_ACCOUNT_ID: &str = "0.0.1234567";

pub fn default_snapshot() -> SettingsSnapshot {
    SettingsSnapshot {
        rev: 1,
        connection: ConnectionSettings {
            init_timeout_ms: 10_000,
            pairing_timeout_ms: 60_000,
            error_display_delay_ms: 3_000,
            retry_after_failures: 1,
        },
        providers: ProviderSettings {
            primary: ProviderKind::Extension,
            fallback: Some(ProviderKind::Relay),
            allow_degraded: true,
            degraded_account_id: DEFAULT_DEGRADED_ACCOUNT_ID.to_string(),
            relay_url: "wss://relay.walletconnect.com".to_string(),
            network: "testnet".to_string(),
        },
        identity: IdentitySettings {
            assignment: AssignmentStrategy::AddressHash,
            default_role: Role::Prosumer,
            catalog_path: None,
        },
        provenance: Default::default(),
    }
}
