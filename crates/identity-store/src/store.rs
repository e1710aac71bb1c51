use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use wattgrid_core_types::{Role, WalletAddress};
use wattgrid_permission_catalog::{Permission, PermissionCatalog};

use crate::clock::{Clock, SystemClock};
use crate::errors::StoreError;

/// One wallet's registered presence in the marketplace.
///
/// Profiles handed out by the store are copies; the only way to change the
/// stored record is through [`IdentityStore`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentityProfile {
    wallet_address: WalletAddress,
    role: Role,
    display_name: Option<String>,
    registered_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    permissions: Vec<Permission>,
    catalog_revision: u64,
}

impl IdentityProfile {
    pub fn wallet_address(&self) -> &WalletAddress {
        &self.wallet_address
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Catalog revision the permission snapshot was taken from.
    pub fn catalog_revision(&self) -> u64 {
        self.catalog_revision
    }

    fn bump(&mut self, now: DateTime<Utc>) {
        if now > self.last_active {
            self.last_active = now;
        }
    }
}

#[derive(Default)]
struct StoreInner {
    profiles: HashMap<WalletAddress, IdentityProfile>,
    order: Vec<WalletAddress>,
}

/// Process-wide wallet -> profile registry.
///
/// Construct one per process (or per test) and share it through `Arc`.
pub struct IdentityStore {
    inner: RwLock<StoreInner>,
    catalog: ArcSwap<PermissionCatalog>,
    clock: Arc<dyn Clock>,
}

impl IdentityStore {
    pub fn new(catalog: PermissionCatalog) -> Self {
        Self::with_clock(catalog, Arc::new(SystemClock))
    }

    pub fn with_clock(catalog: PermissionCatalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            catalog: ArcSwap::from_pointee(catalog),
            clock,
        }
    }

    pub fn catalog(&self) -> Arc<PermissionCatalog> {
        self.catalog.load_full()
    }

    /// Swap the catalog. Existing profiles keep their old snapshot until
    /// [`IdentityStore::refresh_permissions`] is called for them.
    pub fn replace_catalog(&self, catalog: PermissionCatalog) {
        debug!(
            target = "identity-store",
            revision = catalog.revision(),
            "permission catalog replaced"
        );
        self.catalog.store(Arc::new(catalog));
    }

    pub fn get(&self, address: &WalletAddress) -> Option<IdentityProfile> {
        self.inner.read().profiles.get(address).cloned()
    }

    pub fn contains(&self, address: &WalletAddress) -> bool {
        self.inner.read().profiles.contains_key(address)
    }

    /// Create or overwrite the profile for `address`.
    pub fn register(
        &self,
        address: WalletAddress,
        role: Role,
        display_name: Option<String>,
    ) -> IdentityProfile {
        let now = self.clock.now();
        let catalog = self.catalog.load();
        let mut guard = self.inner.write();

        let last_active = match guard.profiles.get(&address) {
            Some(previous) if previous.last_active > now => previous.last_active,
            _ => now,
        };
        let profile = IdentityProfile {
            wallet_address: address.clone(),
            role,
            display_name,
            registered_at: now,
            last_active,
            permissions: catalog.permissions_for(role),
            catalog_revision: catalog.revision(),
        };

        if guard
            .profiles
            .insert(address.clone(), profile.clone())
            .is_none()
        {
            guard.order.push(address.clone());
        }
        debug!(target = "identity-store", %address, %role, "profile registered");
        profile
    }

    pub fn update_role(&self, address: &WalletAddress, role: Role) -> Option<IdentityProfile> {
        let catalog = self.catalog.load();
        self.mutate(address, |profile, now| {
            profile.role = role;
            profile.permissions = catalog.permissions_for(role);
            profile.catalog_revision = catalog.revision();
            profile.bump(now);
        })
        .map_err(log_miss)
        .ok()
    }

    pub fn touch_last_active(&self, address: &WalletAddress) {
        if let Err(err) = self.mutate(address, |profile, now| profile.bump(now)) {
            log_miss(err);
        }
    }

    /// Re-derive the permission snapshot from the current catalog.
    pub fn refresh_permissions(&self, address: &WalletAddress) -> Option<IdentityProfile> {
        let catalog = self.catalog.load();
        self.mutate(address, |profile, now| {
            profile.permissions = catalog.permissions_for(profile.role);
            profile.catalog_revision = catalog.revision();
            profile.bump(now);
        })
        .map_err(log_miss)
        .ok()
    }

    /// Remove the profile. Returns whether anything was removed.
    pub fn clear(&self, address: &WalletAddress) -> bool {
        let mut guard = self.inner.write();
        let removed = guard.profiles.remove(address).is_some();
        if removed {
            guard.order.retain(|entry| entry != address);
            debug!(target = "identity-store", %address, "profile cleared");
        }
        removed
    }

    pub fn list_all(&self) -> Vec<IdentityProfile> {
        let guard = self.inner.read();
        guard
            .order
            .iter()
            .filter_map(|address| guard.profiles.get(address).cloned())
            .collect()
    }

    pub fn list_by_role(&self, role: Role) -> Vec<IdentityProfile> {
        self.list_all()
            .into_iter()
            .filter(|profile| profile.role == role)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mutate<F>(&self, address: &WalletAddress, apply: F) -> Result<IdentityProfile, StoreError>
    where
        F: FnOnce(&mut IdentityProfile, DateTime<Utc>),
    {
        let now = self.clock.now();
        let mut guard = self.inner.write();
        let profile = guard
            .profiles
            .get_mut(address)
            .ok_or_else(|| StoreError::UnknownWalletAddress(address.clone()))?;
        apply(profile, now);
        Ok(profile.clone())
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new(PermissionCatalog::builtin())
    }
}

fn log_miss(err: StoreError) -> StoreError {
    debug!(target = "identity-store", %err, "store operation skipped");
    err
}
