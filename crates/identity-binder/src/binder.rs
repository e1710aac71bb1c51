use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wattgrid_core_types::{Role, WalletAddress};
use wattgrid_identity_store::{
    AccessDecision, AuthorizationEngine, DenyReason, IdentityProfile, IdentityStore,
};
use wattgrid_wallet_connect::{
    ConnectionEvent, ConnectionOrchestrator, ConnectionState, TransitionCause,
};

use crate::assign::RoleAssigner;
use crate::view::SessionView;

/// Display name given to profiles created for the placeholder account.
pub const DEGRADED_DISPLAY_NAME: &str = "Demo account";

#[derive(Clone, Debug)]
struct Bound {
    address: WalletAddress,
    degraded: bool,
}

/// Follows connection transitions and keeps the published [`SessionView`]
/// in step with the identity store.
pub struct IdentityBinder {
    store: Arc<IdentityStore>,
    authz: AuthorizationEngine,
    assigner: Arc<dyn RoleAssigner>,
    view_tx: watch::Sender<SessionView>,
    bound: Mutex<Option<Bound>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<ConnectionEvent>>>,
}

impl IdentityBinder {
    /// Subscribes to `orchestrator` right away; transitions applied after
    /// this call are queued until [`drain`](Self::drain) or
    /// [`attach`](Self::attach) consumes them.
    pub fn new(
        store: Arc<IdentityStore>,
        assigner: Arc<dyn RoleAssigner>,
        orchestrator: &ConnectionOrchestrator,
    ) -> Arc<Self> {
        let (view_tx, _view_rx) = watch::channel(SessionView::default());
        Arc::new(Self {
            authz: AuthorizationEngine::new(Arc::clone(&store)),
            store,
            assigner,
            view_tx,
            bound: Mutex::new(None),
            events: Mutex::new(Some(orchestrator.subscribe())),
        })
    }

    pub fn store(&self) -> &Arc<IdentityStore> {
        &self.store
    }

    pub fn view(&self) -> SessionView {
        self.view_tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    pub fn bound_address(&self) -> Option<WalletAddress> {
        self.bound.lock().as_ref().map(|bound| bound.address.clone())
    }

    /// Consume connection events on a background task. Returns `None` when
    /// already attached.
    pub fn attach(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut events = self.events.lock().take()?;
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                this.apply(&event);
            }
            debug!(target = "identity-binder", "connection event stream closed");
        }))
    }

    /// Apply every queued event in order. No-op once attached.
    pub fn drain(&self) -> usize {
        let mut guard = self.events.lock();
        let Some(events) = guard.as_mut() else {
            return 0;
        };
        let mut applied = 0usize;
        while let Ok(event) = events.try_recv() {
            self.apply(&event);
            applied += 1;
        }
        applied
    }

    /// Bring the view in line with one connection transition.
    pub fn apply(&self, event: &ConnectionEvent) {
        if event.cause == TransitionCause::StatusChanged || event.from == event.to() {
            return;
        }
        debug!(
            target = "identity-binder",
            seq = event.seq,
            from = %event.from,
            to = %event.to(),
            "applying connection transition"
        );

        if !event.entered(ConnectionState::Connected) {
            *self.bound.lock() = None;
            self.view_tx
                .send_replace(SessionView::signed_out(event.to(), event.seq));
            return;
        }

        let Some(address) = event.snapshot.active_account_id.clone() else {
            warn!(target = "identity-binder", seq = event.seq, "connected without an account");
            *self.bound.lock() = None;
            self.view_tx
                .send_replace(SessionView::signed_out(event.to(), event.seq));
            return;
        };
        let degraded = event.snapshot.degraded;

        let profile = if self.store.contains(&address) {
            self.store.refresh_permissions(&address);
            self.store.touch_last_active(&address);
            self.store.get(&address)
        } else {
            let role = self.assigner.assign(&address);
            let display_name = degraded.then(|| DEGRADED_DISPLAY_NAME.to_string());
            info!(
                target = "identity-binder",
                %address,
                %role,
                assigner = self.assigner.name(),
                degraded,
                "provisioning profile for new wallet"
            );
            Some(self.store.register(address.clone(), role, display_name))
        };

        *self.bound.lock() = Some(Bound { address, degraded });
        let view = match profile {
            Some(profile) => SessionView::signed_in(profile, degraded, event.seq),
            None => SessionView {
                degraded,
                ..SessionView::signed_out(ConnectionState::Connected, event.seq)
            },
        };
        self.view_tx.send_replace(view);
    }

    /// Register (or overwrite) the bound wallet's profile.
    pub fn register_user(
        &self,
        role: Role,
        display_name: Option<String>,
    ) -> Option<IdentityProfile> {
        let bound = self.bound.lock().clone()?;
        let profile = self.store.register(bound.address, role, display_name);
        self.publish_profile(Some(profile.clone()));
        Some(profile)
    }

    pub fn update_role(&self, role: Role) -> Option<IdentityProfile> {
        let address = self.bound_address()?;
        let profile = self.store.update_role(&address, role);
        if profile.is_some() {
            self.publish_profile(profile.clone());
        }
        profile
    }

    /// Remove the bound wallet's profile. The connection stays up but the
    /// session is no longer authenticated until a profile is registered.
    pub fn clear_role(&self) -> bool {
        let Some(address) = self.bound_address() else {
            return false;
        };
        let removed = self.store.clear(&address);
        if removed {
            self.publish_profile(None);
        }
        removed
    }

    pub fn refresh_profile(&self) -> Option<IdentityProfile> {
        let address = self.bound_address()?;
        let profile = self.store.refresh_permissions(&address);
        if profile.is_some() {
            self.publish_profile(profile.clone());
        }
        profile
    }

    /// Default deny; false whenever the session is not authenticated.
    pub fn has_permission(&self, action: &str, resource: &str) -> bool {
        self.decide(action, resource).is_allowed()
    }

    pub fn decide(&self, action: &str, resource: &str) -> AccessDecision {
        if !self.view_tx.borrow().is_authenticated {
            return AccessDecision::deny(DenyReason::UnknownIdentity);
        }
        match self.bound_address() {
            Some(address) => self.authz.decide(&address, action, resource),
            None => AccessDecision::deny(DenyReason::UnknownIdentity),
        }
    }

    fn publish_profile(&self, profile: Option<IdentityProfile>) {
        let degraded = self
            .bound
            .lock()
            .as_ref()
            .map(|bound| bound.degraded)
            .unwrap_or(false);
        self.view_tx.send_modify(|view| {
            view.is_authenticated =
                profile.is_some() && view.connection == ConnectionState::Connected;
            view.profile = profile;
            view.degraded = degraded;
        });
    }
}
