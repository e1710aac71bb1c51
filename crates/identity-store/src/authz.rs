use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wattgrid_core_types::WalletAddress;

use crate::store::IdentityStore;

/// Outcome categories of an access check.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Allow,
    Deny,
}

/// Why a check came back denied.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No profile for the wallet.
    UnknownIdentity,
    /// The role's snapshot has no entry for the pair.
    NotGranted,
    /// The role's snapshot lists the pair with `allowed = false`.
    ExplicitDeny,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessDecision {
    pub kind: DecisionKind,
    pub reason: Option<DenyReason>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            kind: DecisionKind::Allow,
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            kind: DecisionKind::Deny,
            reason: Some(reason),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.kind == DecisionKind::Allow
    }
}

/// Read-only permission queries over an [`IdentityStore`]. Default deny.
#[derive(Clone)]
pub struct AuthorizationEngine {
    store: Arc<IdentityStore>,
}

impl AuthorizationEngine {
    pub fn new(store: Arc<IdentityStore>) -> Self {
        Self { store }
    }

    pub fn decide(&self, address: &WalletAddress, action: &str, resource: &str) -> AccessDecision {
        let Some(profile) = self.store.get(address) else {
            return AccessDecision::deny(DenyReason::UnknownIdentity);
        };

        let mut listed = false;
        for permission in profile.permissions() {
            if permission.matches(action, resource) {
                if permission.allowed {
                    return AccessDecision::allow();
                }
                listed = true;
            }
        }

        if listed {
            AccessDecision::deny(DenyReason::ExplicitDeny)
        } else {
            AccessDecision::deny(DenyReason::NotGranted)
        }
    }

    pub fn has_permission(&self, address: &WalletAddress, action: &str, resource: &str) -> bool {
        self.decide(address, action, resource).is_allowed()
    }
}
