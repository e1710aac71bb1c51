use std::sync::Arc;
use std::time::Duration;

use wattgrid_core_types::ProviderKind;
use wattgrid_wallet_connect::{
    ConnectError, ConnectOutcome, ConnectionOrchestrator, ConnectionProvider, ConnectionState,
    ExtensionProvider, OrchestratorConfig, PairingBehaviour, RelayProvider, TransitionCause,
    DEGRADED_ACCOUNT_ID,
};

fn approving(account: &str) -> Arc<ExtensionProvider> {
    ExtensionProvider::new("wattgrid", PairingBehaviour::AutoApprove(vec![account.into()]))
}

fn orchestrator(primary: Arc<ExtensionProvider>) -> Arc<ConnectionOrchestrator> {
    ConnectionOrchestrator::new(primary, None, OrchestratorConfig::default())
}

#[tokio::test]
async fn approved_pairing_connects_and_resets_attempts() {
    let orch = orchestrator(approving("0.0.4821"));
    let mut events = orch.subscribe();

    let outcome = orch.connect().await.expect("connect");
    assert_eq!(outcome.account().map(|a| a.as_str()), Some("0.0.4821"));

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(snapshot.attempt_count, 0);
    assert_eq!(snapshot.provider, Some(ProviderKind::Extension));
    assert!(snapshot.last_error.is_none());
    assert!(!snapshot.degraded);

    let mut causes = Vec::new();
    let mut last_seq = 0;
    while let Ok(event) = events.try_recv() {
        assert!(event.seq > last_seq);
        last_seq = event.seq;
        causes.push(event.cause);
    }
    assert_eq!(
        causes,
        vec![
            TransitionCause::ConnectRequested,
            TransitionCause::StatusChanged,
            TransitionCause::Paired,
        ]
    );
}

#[tokio::test]
async fn connect_while_connected_returns_current_account() {
    let orch = orchestrator(approving("0.0.4821"));
    orch.connect().await.expect("connect");

    let again = orch.connect().await.expect("second connect");
    match again {
        ConnectOutcome::AlreadyConnected(account) => assert_eq!(account.as_str(), "0.0.4821"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(orch.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn second_connect_during_pairing_is_a_no_op() {
    let ext = ExtensionProvider::new("wattgrid", PairingBehaviour::Manual);
    let orch = orchestrator(ext.clone());
    let mut watch = orch.watch();

    let first = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.connect().await }
    });
    watch
        .wait_for(|snapshot| snapshot.is_connecting())
        .await
        .expect("watch open");

    let second = orch.connect().await.expect("no-op connect");
    assert_eq!(second, ConnectOutcome::InProgress);
    assert_eq!(orch.snapshot().attempt_count, 1);

    assert!(ext.approve(["0.0.9001"]));
    let outcome = first.await.expect("join").expect("connect");
    assert_eq!(outcome.account().map(|a| a.as_str()), Some("0.0.9001"));
}

#[tokio::test]
async fn rejection_maps_to_user_cancelled() {
    let ext = ExtensionProvider::new("wattgrid", PairingBehaviour::Reject);
    let orch = orchestrator(ext);

    let err = orch.connect().await.expect_err("rejected");
    assert_eq!(err, ConnectError::UserCancelled);

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Error);
    assert_eq!(snapshot.last_error, Some(ConnectError::UserCancelled));
    assert_eq!(snapshot.attempt_count, 1);
    assert!(!snapshot.retry_available);

    orch.connect().await.expect_err("rejected again");
    let snapshot = orch.snapshot();
    assert_eq!(snapshot.attempt_count, 2);
    assert!(snapshot.retry_available);
}

#[tokio::test]
async fn missing_wallet_falls_back_to_degraded_placeholder() {
    let orch = orchestrator(ExtensionProvider::missing("wattgrid"));

    let outcome = orch.connect().await.expect("degraded connect");
    assert_eq!(
        outcome,
        ConnectOutcome::Connected {
            account: DEGRADED_ACCOUNT_ID.parse().unwrap(),
            provider: ProviderKind::Degraded,
            degraded: true,
        }
    );

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert!(snapshot.degraded);
    assert!(matches!(
        snapshot.warning,
        Some(ConnectError::ProviderUnavailable(_))
    ));
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn missing_wallet_without_degraded_mode_fails() {
    let config = OrchestratorConfig {
        allow_degraded: false,
        ..OrchestratorConfig::default()
    };
    let orch = ConnectionOrchestrator::new(ExtensionProvider::missing("wattgrid"), None, config);

    let err = orch.connect().await.expect_err("no provider");
    assert!(matches!(err, ConnectError::ProviderUnavailable(_)));
    assert_eq!(orch.state(), ConnectionState::Error);
}

#[tokio::test]
async fn relay_fallback_pairs_when_extension_is_missing() {
    let relay = RelayProvider::new(
        "wss://relay.walletconnect.com",
        "testnet",
        PairingBehaviour::AutoApprove(vec!["hedera:testnet:0.0.4821".into()]),
    );
    let orch = ConnectionOrchestrator::new(
        ExtensionProvider::missing("wattgrid"),
        Some(relay.clone() as Arc<dyn ConnectionProvider>),
        OrchestratorConfig::default(),
    );

    let outcome = orch.connect().await.expect("relay connect");
    assert_eq!(
        outcome,
        ConnectOutcome::Connected {
            account: "0.0.4821".parse().unwrap(),
            provider: ProviderKind::Relay,
            degraded: false,
        }
    );
    assert!(relay.is_paired());
}

#[tokio::test(start_paused = true)]
async fn silent_wallet_times_out() {
    let ext = ExtensionProvider::new("wattgrid", PairingBehaviour::Manual);
    let orch = orchestrator(ext);

    let err = orch.connect().await.expect_err("timeout");
    assert_eq!(err, ConnectError::Timeout(60_000));

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Error);
    assert!(snapshot.extended);
    assert!(snapshot.retry_available);
}

#[tokio::test]
async fn expired_request_uses_configured_timeout() {
    let ext = ExtensionProvider::new("wattgrid", PairingBehaviour::Expire);
    let config = OrchestratorConfig {
        pairing_timeout: Duration::from_secs(5),
        ..OrchestratorConfig::default()
    };
    let orch = ConnectionOrchestrator::new(ext, None, config);

    let err = orch.connect().await.expect_err("expired");
    assert_eq!(err, ConnectError::Timeout(5_000));
    assert!(!orch.snapshot().extended);
}

#[tokio::test]
async fn wallet_side_disconnect_clears_account() {
    let ext = approving("0.0.4821");
    let orch = orchestrator(ext.clone());
    let mut events = orch.subscribe();
    orch.connect().await.expect("connect");

    assert!(ext.disconnect(Some("wallet locked".into())));
    assert_eq!(orch.pump().await, 1);

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Disconnected);
    assert!(snapshot.active_account_id.is_none());

    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.from != event.to() {
            states.push(event.to());
        }
    }
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ]
    );
}

#[tokio::test]
async fn listener_applies_pushed_disconnects() {
    let ext = approving("0.0.4821");
    let orch = orchestrator(ext.clone());
    orch.connect().await.expect("connect");

    let listener = orch.spawn_listener();
    let mut watch = orch.watch();
    ext.disconnect(None);
    watch
        .wait_for(|snapshot| snapshot.state == ConnectionState::Disconnected)
        .await
        .expect("watch open");
    listener.abort();

    orch.connect().await.expect("reconnect");
    assert_eq!(orch.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn explicit_disconnect_and_reset() {
    let orch = orchestrator(approving("0.0.4821"));
    assert!(!orch.disconnect().await);
    assert!(!orch.reset());

    orch.connect().await.expect("connect");
    assert!(orch.disconnect().await);
    assert_eq!(orch.state(), ConnectionState::Disconnected);
    assert!(!orch.reset());
}

#[tokio::test]
async fn reset_returns_error_to_idle() {
    let orch = orchestrator(ExtensionProvider::new(
        "wattgrid",
        PairingBehaviour::Reject,
    ));
    orch.connect().await.expect_err("rejected");

    assert!(orch.reset());
    let snapshot = orch.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Idle);
    assert_eq!(snapshot.attempt_count, 0);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn approval_after_reset_is_ignored() {
    let ext = ExtensionProvider::new("wattgrid", PairingBehaviour::Manual);
    let orch = orchestrator(ext.clone());
    let mut watch = orch.watch();

    let pending = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.connect().await }
    });
    watch
        .wait_for(|snapshot| snapshot.is_connecting())
        .await
        .expect("watch open");

    assert!(orch.reset());
    ext.approve(["0.0.4821"]);

    let outcome = pending.await.expect("join").expect("connect");
    assert_eq!(outcome, ConnectOutcome::Reset);
    assert_eq!(orch.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn reset_attempt_deadline_does_not_fail_the_next_attempt() {
    let ext = ExtensionProvider::new("wattgrid", PairingBehaviour::Manual);
    let orch = orchestrator(ext.clone());

    let first = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.connect().await }
    });
    tokio::time::sleep(Duration::from_secs(55)).await;
    assert_eq!(orch.state(), ConnectionState::Connecting);

    assert!(orch.reset());
    let outcome = first.await.expect("join").expect("connect");
    assert_eq!(outcome, ConnectOutcome::Reset);

    let second = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.connect().await }
    });
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connecting);
    assert!(snapshot.last_error.is_none());
    assert_eq!(snapshot.attempt_count, 1);

    let err = second.await.expect("join").expect_err("timeout");
    assert_eq!(err, ConnectError::Timeout(60_000));
}
