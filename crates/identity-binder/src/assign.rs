use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use wattgrid_core_types::{Role, WalletAddress};
use wattgrid_settings::AssignmentStrategy;

/// Picks the role for a wallet seen for the first time.
pub trait RoleAssigner: Send + Sync {
    fn assign(&self, address: &WalletAddress) -> Role;

    fn name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedRole(pub Role);

impl RoleAssigner for FixedRole {
    fn assign(&self, _address: &WalletAddress) -> Role {
        self.0
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Same address, same role: parity of the first SHA-256 byte.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddressHashAssigner;

impl RoleAssigner for AddressHashAssigner {
    fn assign(&self, address: &WalletAddress) -> Role {
        let digest = Sha256::digest(address.as_str().as_bytes());
        if digest[0] % 2 == 0 {
            Role::Prosumer
        } else {
            Role::Viewer
        }
    }

    fn name(&self) -> &'static str {
        "address_hash"
    }
}

/// Even odds per new wallet.
pub struct RandomAssigner {
    rng: Mutex<StdRng>,
}

impl RandomAssigner {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomAssigner {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleAssigner for RandomAssigner {
    fn assign(&self, _address: &WalletAddress) -> Role {
        if self.rng.lock().gen_bool(0.5) {
            Role::Prosumer
        } else {
            Role::Viewer
        }
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

pub fn assigner_for(strategy: AssignmentStrategy, default_role: Role) -> Arc<dyn RoleAssigner> {
    match strategy {
        AssignmentStrategy::Fixed => Arc::new(FixedRole(default_role)),
        AssignmentStrategy::AddressHash => Arc::new(AddressHashAssigner),
        AssignmentStrategy::Random => Arc::new(RandomAssigner::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: &str) -> WalletAddress {
        WalletAddress::parse(raw).unwrap()
    }

    #[test]
    fn address_hash_is_stable() {
        let assigner = AddressHashAssigner;
        for raw in ["0.0.4821", "0.0.1234567", "0xabc"] {
            let address = addr(raw);
            assert_eq!(assigner.assign(&address), assigner.assign(&address));
        }
    }

    #[test]
    fn address_hash_reaches_both_roles() {
        let assigner = AddressHashAssigner;
        let roles: Vec<Role> = (0..64)
            .map(|n| assigner.assign(&addr(&format!("0.0.{n}"))))
            .collect();
        assert!(roles.contains(&Role::Prosumer));
        assert!(roles.contains(&Role::Viewer));
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let a = RandomAssigner::seeded(7);
        let b = RandomAssigner::seeded(7);
        let address = addr("0.0.1");
        let first: Vec<Role> = (0..16).map(|_| a.assign(&address)).collect();
        let second: Vec<Role> = (0..16).map(|_| b.assign(&address)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn strategy_selects_assigner() {
        let fixed = assigner_for(AssignmentStrategy::Fixed, Role::Viewer);
        assert_eq!(fixed.name(), "fixed");
        assert_eq!(fixed.assign(&addr("0.0.9")), Role::Viewer);
        assert_eq!(
            assigner_for(AssignmentStrategy::AddressHash, Role::Viewer).name(),
            "address_hash"
        );
        assert_eq!(
            assigner_for(AssignmentStrategy::Random, Role::Viewer).name(),
            "random"
        );
    }
}
