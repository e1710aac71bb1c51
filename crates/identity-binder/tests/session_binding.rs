use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;
use wattgrid_core_types::{ProviderKind, Role};
use wattgrid_identity_binder::{FixedRole, IdentityBinder, DEGRADED_DISPLAY_NAME};
use wattgrid_identity_store::{DenyReason, IdentityStore, ManualClock};
use wattgrid_permission_catalog::PermissionCatalog;
use wattgrid_wallet_connect::{
    ConnectionOrchestrator, ConnectionState, ExtensionProvider, OrchestratorConfig,
    PairingBehaviour, DEGRADED_ACCOUNT_ID,
};

struct Harness {
    clock: Arc<ManualClock>,
    store: Arc<IdentityStore>,
    ext: Arc<ExtensionProvider>,
    orch: Arc<ConnectionOrchestrator>,
    binder: Arc<IdentityBinder>,
}

fn harness(ext: Arc<ExtensionProvider>, role: Role) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(IdentityStore::with_clock(
        PermissionCatalog::builtin(),
        clock.clone(),
    ));
    let orch = ConnectionOrchestrator::new(ext.clone(), None, OrchestratorConfig::default());
    let binder = IdentityBinder::new(store.clone(), Arc::new(FixedRole(role)), &orch);
    Harness {
        clock,
        store,
        ext,
        orch,
        binder,
    }
}

fn approving(account: &str) -> Arc<ExtensionProvider> {
    ExtensionProvider::new("wattgrid", PairingBehaviour::AutoApprove(vec![account.into()]))
}

#[tokio::test]
async fn degraded_connection_provisions_demo_profile() {
    let h = harness(ExtensionProvider::missing("wattgrid"), Role::Prosumer);
    h.orch.connect().await.expect("degraded connect");
    h.binder.drain();

    let view = h.binder.view();
    assert!(view.is_authenticated);
    assert!(view.degraded);
    let profile = view.profile.expect("profile");
    assert_eq!(profile.wallet_address().as_str(), DEGRADED_ACCOUNT_ID);
    assert_eq!(profile.display_name(), Some(DEGRADED_DISPLAY_NAME));
    assert_eq!(profile.role(), Role::Prosumer);
    assert_eq!(h.orch.snapshot().provider, Some(ProviderKind::Degraded));
}

#[tokio::test]
async fn connect_then_disconnect_keeps_profile_but_signs_out() {
    let h = harness(approving("0.0.4821"), Role::Viewer);
    h.orch.connect().await.expect("connect");
    h.ext.disconnect(None);
    h.orch.pump().await;

    // connecting, status, connected, disconnected: all queued, applied in order.
    assert_eq!(h.binder.drain(), 4);
    let view = h.binder.view();
    assert!(!view.is_authenticated);
    assert!(view.profile.is_none());
    assert_eq!(view.connection, ConnectionState::Disconnected);
    assert!(h.store.contains(&"0.0.4821".parse().unwrap()));
    assert!(h.binder.bound_address().is_none());
}

#[tokio::test]
async fn returning_wallet_is_refreshed_not_reregistered() {
    let h = harness(approving("0.0.4821"), Role::Viewer);
    h.orch.connect().await.expect("connect");
    h.binder.drain();
    let first = h.binder.view().profile.expect("profile");

    h.orch.disconnect().await;
    h.store
        .replace_catalog(PermissionCatalog::builtin().with_revision(2));
    h.clock.advance(Duration::seconds(30));
    h.orch.connect().await.expect("reconnect");
    h.binder.drain();

    let again = h.binder.view().profile.expect("profile");
    assert_eq!(again.registered_at(), first.registered_at());
    assert!(again.last_active() > first.last_active());
    assert_eq!(again.catalog_revision(), 2);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn permission_checks_follow_the_session() {
    let h = harness(approving("0.0.4821"), Role::Viewer);
    assert!(!h.binder.has_permission("view", "market"));

    h.orch.connect().await.expect("connect");
    h.binder.drain();
    assert!(h.binder.has_permission("view", "market"));
    assert!(!h.binder.has_permission("buy", "energy"));
    assert_eq!(
        h.binder.decide("buy", "energy").reason,
        Some(DenyReason::ExplicitDeny)
    );
    assert_eq!(
        h.binder.decide("delete", "market").reason,
        Some(DenyReason::NotGranted)
    );

    h.orch.disconnect().await;
    h.binder.drain();
    assert!(!h.binder.has_permission("view", "market"));
    assert_eq!(
        h.binder.decide("view", "market").reason,
        Some(DenyReason::UnknownIdentity)
    );
}

#[tokio::test]
async fn failed_attempt_publishes_signed_out_view() {
    let h = harness(
        ExtensionProvider::new("wattgrid", PairingBehaviour::Reject),
        Role::Prosumer,
    );
    h.orch.connect().await.expect_err("rejected");
    h.binder.drain();

    let view = h.binder.view();
    assert!(!view.is_authenticated);
    assert_eq!(view.connection, ConnectionState::Error);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn consumer_operations_act_on_bound_wallet() {
    let h = harness(approving("0.0.4821"), Role::Viewer);
    assert!(h.binder.update_role(Role::Prosumer).is_none());
    assert!(!h.binder.clear_role());

    h.orch.connect().await.expect("connect");
    h.binder.drain();

    let promoted = h.binder.update_role(Role::Prosumer).expect("update");
    assert_eq!(promoted.role(), Role::Prosumer);
    assert!(h.binder.has_permission("sell", "energy"));

    assert!(h.binder.clear_role());
    let view = h.binder.view();
    assert!(!view.is_authenticated);
    assert_eq!(view.connection, ConnectionState::Connected);
    assert!(!h.binder.has_permission("view", "market"));
    assert!(h.binder.refresh_profile().is_none());

    let registered = h
        .binder
        .register_user(Role::Viewer, Some("Meter reader".into()))
        .expect("register");
    assert_eq!(registered.display_name(), Some("Meter reader"));
    assert!(h.binder.view().is_authenticated);

    let refreshed = h.binder.refresh_profile().expect("refresh");
    assert_eq!(refreshed.role(), Role::Viewer);
}

#[tokio::test]
async fn attached_binder_tracks_transitions() {
    let h = harness(approving("0.0.4821"), Role::Prosumer);
    let task = h.binder.attach().expect("first attach");
    assert!(h.binder.attach().is_none());
    assert_eq!(h.binder.drain(), 0);

    let mut views = h.binder.watch();
    h.orch.connect().await.expect("connect");
    views
        .wait_for(|view| view.is_authenticated)
        .await
        .expect("view channel open");

    h.orch.disconnect().await;
    views
        .wait_for(|view| view.connection == ConnectionState::Disconnected)
        .await
        .expect("view channel open");
    assert!(!h.binder.view().is_authenticated);
    task.abort();
}
