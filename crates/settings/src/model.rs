use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wattgrid_core_types::{ProviderKind, Role};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SettingsSnapshot {
    pub rev: u64,
    pub connection: ConnectionSettings,
    pub providers: ProviderSettings,
    pub identity: IdentitySettings,
    #[serde(default)]
    pub provenance: BTreeMap<String, SettingSource>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Upper bound for a provider's `initiate` call.
    pub init_timeout_ms: u64,
    /// How long a pairing request may stay unanswered.
    pub pairing_timeout_ms: u64,
    /// A connecting phase longer than this counts as "extended".
    pub error_display_delay_ms: u64,
    /// Retry affordance is offered once attempts exceed this count.
    pub retry_after_failures: u32,
}

impl ConnectionSettings {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_millis(self.pairing_timeout_ms)
    }

    pub fn error_display_delay(&self) -> Duration {
        Duration::from_millis(self.error_display_delay_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSettings {
    pub primary: ProviderKind,
    pub fallback: Option<ProviderKind>,
    pub allow_degraded: bool,
    pub degraded_account_id: String,
    pub relay_url: String,
    pub network: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Every new wallet gets `identity.default_role`.
    Fixed,
    /// Deterministic role derived from a digest of the wallet address.
    AddressHash,
    /// Coin flip per new wallet.
    Random,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentitySettings {
    pub assignment: AssignmentStrategy,
    pub default_role: Role,
    pub catalog_path: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettingSource {
    Builtin,
    File,
    Env,
    Cli,
}

impl SettingsSnapshot {
    pub fn set_provenance(&mut self, path: &str, source: SettingSource) {
        self.provenance.insert(path.to_string(), source);
    }

    pub fn source_of(&self, path: &str) -> Option<SettingSource> {
        self.provenance.get(path).copied()
    }
}
