use std::io::Write;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use wattgrid_cli::{AppContext, ContextError, ContextOptions};
use wattgrid_core_types::{ProviderKind, Role};
use wattgrid_identity_binder::{FixedRole, DEGRADED_DISPLAY_NAME};
use wattgrid_settings::{default_snapshot, SettingsSnapshot};
use wattgrid_wallet_connect::{ConnectError, ConnectionState, PairingBehaviour};

fn approve(account: &str) -> ContextOptions {
    ContextOptions {
        behaviour: PairingBehaviour::AutoApprove(vec![account.to_string()]),
        assigner: Some(Arc::new(FixedRole(Role::Prosumer))),
        ..ContextOptions::default()
    }
}

fn offline_settings() -> SettingsSnapshot {
    let mut settings = default_snapshot();
    settings.providers.fallback = None;
    settings
}

#[tokio::test]
async fn no_wallet_lands_in_degraded_demo_session() {
    let app = AppContext::new(
        offline_settings(),
        ContextOptions {
            extension_installed: false,
            ..ContextOptions::default()
        },
    )
    .expect("context");

    app.orchestrator().connect().await.expect("degraded connect");
    app.binder().drain();

    let view = app.binder().view();
    assert!(view.is_authenticated);
    assert!(view.degraded);
    let profile = view.profile.expect("profile");
    assert_eq!(profile.wallet_address().as_str(), "0.0.1234567");
    assert_eq!(profile.display_name(), Some(DEGRADED_DISPLAY_NAME));
    assert_eq!(
        app.orchestrator().snapshot().provider,
        Some(ProviderKind::Degraded)
    );
}

#[tokio::test]
async fn missing_extension_pairs_over_relay_by_default() {
    let options = ContextOptions {
        extension_installed: false,
        ..approve("hedera:testnet:0.0.4821")
    };
    let app = AppContext::new(default_snapshot(), options).expect("context");

    app.orchestrator().connect().await.expect("relay connect");
    app.binder().drain();

    let snapshot = app.orchestrator().snapshot();
    assert_eq!(snapshot.provider, Some(ProviderKind::Relay));
    assert_eq!(
        snapshot.active_account_id.map(|a| a.to_string()),
        Some("0.0.4821".to_string())
    );
    assert!(app.binder().has_permission("sell", "energy"));
}

#[tokio::test]
async fn connect_disconnect_reconnect_keeps_one_profile() {
    let app = AppContext::new(default_snapshot(), approve("0.0.4821")).expect("context");
    let orchestrator = app.orchestrator();
    let binder = app.binder();

    orchestrator.connect().await.expect("connect");
    orchestrator.disconnect().await;
    binder.drain();
    let view = binder.view();
    assert!(!view.is_authenticated);
    assert_eq!(view.connection, ConnectionState::Disconnected);
    assert_eq!(app.store().len(), 1);

    orchestrator.connect().await.expect("reconnect");
    binder.drain();
    assert!(binder.view().is_authenticated);
    assert_eq!(app.store().len(), 1);
}

#[tokio::test]
async fn double_connect_counts_one_attempt() {
    let app = AppContext::new(default_snapshot(), ContextOptions::default()).expect("context");
    let orchestrator = app.orchestrator();
    let mut watch = orchestrator.watch();

    let pending = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.connect().await }
    });
    watch
        .wait_for(|snapshot| snapshot.is_connecting())
        .await
        .expect("watch");
    orchestrator.connect().await.expect("no-op");
    assert_eq!(orchestrator.snapshot().attempt_count, 1);

    app.extension().reject();
    let err = pending.await.expect("join").expect_err("rejected");
    assert_eq!(err, ConnectError::UserCancelled);
}

#[tokio::test]
async fn catalog_file_drives_permissions() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(
        file,
        r#"
version: 7
roles:
  prosumer:
    - {{ action: view, resource: dashboard }}
  viewer:
    - {{ action: view, resource: dashboard }}
    - {{ action: export, resource: report }}
"#
    )
    .expect("write");

    let mut settings = default_snapshot();
    settings.identity.catalog_path = Some(file.path().display().to_string());
    let options = ContextOptions {
        assigner: Some(Arc::new(FixedRole(Role::Viewer))),
        ..approve("0.0.4821")
    };
    let app = AppContext::new(settings, options).expect("context");
    assert_eq!(app.store().catalog().revision(), 7);

    app.orchestrator().connect().await.expect("connect");
    app.binder().drain();
    assert!(app.binder().has_permission("export", "report"));
    assert!(!app.binder().has_permission("view", "market"));
}

#[test]
fn unreadable_catalog_is_a_context_error() {
    let mut settings = default_snapshot();
    settings.identity.catalog_path = Some("/definitely/not/here.yaml".into());
    let err = match AppContext::new(settings, ContextOptions::default()) {
        Ok(_) => panic!("expected catalog error"),
        Err(err) => err,
    };
    assert!(matches!(err, ContextError::Catalog { .. }));
}
