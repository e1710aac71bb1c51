use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};
use wattgrid_core_types::{ProviderKind, WalletAddress};
use wattgrid_event_bus::{EventBus, InMemoryBus};
use wattgrid_settings::SettingsSnapshot;

use crate::errors::{classify, ConnectError};
use crate::model::{
    ConnectOutcome, ConnectionEvent, ConnectionSnapshot, ConnectionState, TransitionCause,
};
use crate::provider::{ConnectionProvider, ProviderSignal, SignalSink, TaggedSignal};

/// Placeholder account reported in degraded mode.
pub const DEGRADED_ACCOUNT_ID: &str = wattgrid_settings::DEFAULT_DEGRADED_ACCOUNT_ID;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub init_timeout: Duration,
    pub pairing_timeout: Duration,
    pub error_display_delay: Duration,
    pub retry_after_failures: u32,
    pub allow_degraded: bool,
    pub degraded_account_id: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(10),
            pairing_timeout: Duration::from_secs(60),
            error_display_delay: Duration::from_millis(3_000),
            retry_after_failures: 1,
            allow_degraded: true,
            degraded_account_id: DEGRADED_ACCOUNT_ID.to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &SettingsSnapshot) -> Self {
        Self {
            init_timeout: settings.connection.init_timeout(),
            pairing_timeout: settings.connection.pairing_timeout(),
            error_display_delay: settings.connection.error_display_delay(),
            retry_after_failures: settings.connection.retry_after_failures,
            allow_degraded: settings.providers.allow_degraded,
            degraded_account_id: settings.providers.degraded_account_id.clone(),
        }
    }

    fn pairing_timeout_ms(&self) -> u64 {
        u64::try_from(self.pairing_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn init_timeout_ms(&self) -> u64 {
        u64::try_from(self.init_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

struct Machine {
    snapshot: ConnectionSnapshot,
    seq: u64,
    /// Provider whose signals are currently honoured.
    active: Option<ProviderKind>,
    connecting_started: Option<Instant>,
    /// Bumped by every connect and reset; a pending attempt only acts while
    /// its generation is current.
    generation: u64,
}

impl Machine {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.snapshot.is_connecting()
    }
}

enum Begin {
    Proceed(u64),
    InProgress,
    AlreadyConnected(WalletAddress),
}

enum InitResult {
    Started,
    /// Reset or replaced by a newer connect while providers were starting.
    Superseded,
    Unavailable(ConnectError),
    Failed(ConnectError, TransitionCause),
}

/// Drives the wallet handshake and owns the connection state.
///
/// All state changes go through one transition function, which publishes a
/// [`ConnectionEvent`] per change on the event bus while still holding the
/// state lock, so observers see transitions in the order they were applied.
pub struct ConnectionOrchestrator {
    primary: Arc<dyn ConnectionProvider>,
    fallback: Option<Arc<dyn ConnectionProvider>>,
    config: OrchestratorConfig,
    machine: Mutex<Machine>,
    bus: Arc<InMemoryBus<ConnectionEvent>>,
    watch_tx: watch::Sender<ConnectionSnapshot>,
    signals: AsyncMutex<mpsc::UnboundedReceiver<TaggedSignal>>,
    _signal_tx: mpsc::UnboundedSender<TaggedSignal>,
}

impl ConnectionOrchestrator {
    pub fn new(
        primary: Arc<dyn ConnectionProvider>,
        fallback: Option<Arc<dyn ConnectionProvider>>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        primary.bind(SignalSink::new(primary.kind(), signal_tx.clone()));
        if let Some(fallback) = &fallback {
            fallback.bind(SignalSink::new(fallback.kind(), signal_tx.clone()));
        }

        let (watch_tx, _watch_rx) = watch::channel(ConnectionSnapshot::idle());
        Arc::new(Self {
            primary,
            fallback,
            config,
            machine: Mutex::new(Machine {
                snapshot: ConnectionSnapshot::idle(),
                seq: 0,
                active: None,
                connecting_started: None,
                generation: 0,
            }),
            bus: InMemoryBus::new(),
            watch_tx,
            signals: AsyncMutex::new(signal_rx),
            _signal_tx: signal_tx,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.machine.lock().snapshot.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.machine.lock().snapshot.state
    }

    /// Ordered stream of every transition applied after this call.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        self.bus.subscribe()
    }

    /// Latest snapshot, for consumers that only care about the current value.
    pub fn watch(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.watch_tx.subscribe()
    }

    /// Request a connection.
    ///
    /// No-op while an attempt is in flight; returns the current account
    /// when already connected.
    pub async fn connect(&self) -> Result<ConnectOutcome, ConnectError> {
        let generation = match self.begin_connect() {
            Begin::InProgress => {
                debug!(target = "wallet-connect", "connect ignored; attempt in flight");
                return Ok(ConnectOutcome::InProgress);
            }
            Begin::AlreadyConnected(account) => {
                return Ok(ConnectOutcome::AlreadyConnected(account));
            }
            Begin::Proceed(generation) => generation,
        };

        match self.initiate_providers(generation).await {
            InitResult::Started => self.await_pairing(generation).await,
            InitResult::Superseded => self.settle(generation),
            InitResult::Unavailable(reason) => self.enter_degraded(generation, reason),
            InitResult::Failed(err, cause) => {
                self.fail(generation, err, cause);
                self.settle(generation)
            }
        }
    }

    /// Explicit disconnect. Returns false when not connected.
    pub async fn disconnect(&self) -> bool {
        let active = {
            let machine = self.machine.lock();
            if !machine.snapshot.is_connected() {
                return false;
            }
            machine.active
        };

        if let Some(provider) = active.and_then(|kind| self.provider_for(kind)) {
            provider.teardown().await;
        }

        let mut machine = self.machine.lock();
        if !machine.snapshot.is_connected() {
            return false;
        }
        machine.active = None;
        self.apply(&mut machine, TransitionCause::DisconnectRequested, |s| {
            s.state = ConnectionState::Disconnected;
            s.active_account_id = None;
            s.provider = None;
            s.degraded = false;
            s.warning = None;
            s.status_message = None;
        });
        true
    }

    /// Return to `idle` from `error` or `connecting`, clearing the attempt
    /// counter and the last error. A pending [`connect`](Self::connect)
    /// returns [`ConnectOutcome::Reset`] and its deadline no longer applies.
    pub fn reset(&self) -> bool {
        let mut machine = self.machine.lock();
        if !matches!(
            machine.snapshot.state,
            ConnectionState::Error | ConnectionState::Connecting
        ) {
            return false;
        }
        machine.active = None;
        machine.connecting_started = None;
        machine.generation += 1;
        self.apply(&mut machine, TransitionCause::Reset, |s| {
            *s = ConnectionSnapshot::idle();
        })
        .is_some()
    }

    /// Apply every provider signal queued so far without waiting.
    pub async fn pump(&self) -> usize {
        let mut signals = self.signals.lock().await;
        let mut handled = 0usize;
        while let Ok((kind, signal)) = signals.try_recv() {
            self.handle_signal(kind, signal);
            handled += 1;
        }
        handled
    }

    /// Apply provider-pushed signals as they arrive. Abort the returned
    /// handle to stop listening.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let next = {
                    let mut signals = this.signals.lock().await;
                    signals.recv().await
                };
                match next {
                    Some((kind, signal)) => this.handle_signal(kind, signal),
                    None => break,
                }
            }
        })
    }

    fn provider_for(&self, kind: ProviderKind) -> Option<Arc<dyn ConnectionProvider>> {
        if self.primary.kind() == kind {
            return Some(Arc::clone(&self.primary));
        }
        self.fallback
            .as_ref()
            .filter(|provider| provider.kind() == kind)
            .map(Arc::clone)
    }

    fn begin_connect(&self) -> Begin {
        let mut machine = self.machine.lock();
        match (&machine.snapshot.state, &machine.snapshot.active_account_id) {
            (ConnectionState::Connecting, _) => return Begin::InProgress,
            (ConnectionState::Connected, Some(account)) => {
                return Begin::AlreadyConnected(account.clone())
            }
            _ => {}
        }

        machine.active = None;
        machine.connecting_started = Some(Instant::now());
        machine.generation += 1;
        let generation = machine.generation;
        self.apply(&mut machine, TransitionCause::ConnectRequested, |s| {
            s.state = ConnectionState::Connecting;
            s.attempt_count = s.attempt_count.saturating_add(1);
            s.last_error = None;
            s.warning = None;
            s.active_account_id = None;
            s.provider = None;
            s.degraded = false;
            s.status_message = None;
            s.connecting_since = Some(Utc::now());
            s.extended = false;
            s.retry_available = false;
        });
        Begin::Proceed(generation)
    }

    async fn initiate_providers(&self, generation: u64) -> InitResult {
        let mut unavailable = None;
        let candidates = std::iter::once(&self.primary).chain(self.fallback.iter());

        for provider in candidates {
            let kind = provider.kind();
            {
                let mut machine = self.machine.lock();
                if !machine.is_current(generation) {
                    return InitResult::Superseded;
                }
                machine.active = Some(kind);
            }
            match timeout(self.config.init_timeout, provider.initiate()).await {
                Ok(Ok(())) => {
                    info!(target = "wallet-connect", provider = %kind, "provider initiated");
                    return InitResult::Started;
                }
                Ok(Err(err)) => match classify(&err) {
                    ConnectError::ProviderUnavailable(reason) => {
                        warn!(
                            target = "wallet-connect",
                            provider = %kind,
                            %reason,
                            "provider unavailable; trying next"
                        );
                        unavailable = Some(ConnectError::ProviderUnavailable(reason));
                    }
                    other => return InitResult::Failed(other, TransitionCause::ProviderFailed),
                },
                Err(_) => {
                    return InitResult::Failed(
                        ConnectError::Timeout(self.config.init_timeout_ms()),
                        TransitionCause::TimedOut,
                    )
                }
            }
        }

        {
            let mut machine = self.machine.lock();
            if machine.is_current(generation) {
                machine.active = None;
            }
        }
        InitResult::Unavailable(unavailable.unwrap_or_else(|| {
            ConnectError::ProviderUnavailable("no wallet provider configured".into())
        }))
    }

    async fn await_pairing(&self, generation: u64) -> Result<ConnectOutcome, ConnectError> {
        let deadline = Instant::now() + self.config.pairing_timeout;
        // Any transition wakes the wait, so a reset is noticed without a signal.
        let mut changes = self.watch_tx.subscribe();
        let waited = timeout_at(deadline, async {
            let mut signals = self.signals.lock().await;
            while self.machine.lock().is_current(generation) {
                tokio::select! {
                    next = signals.recv() => match next {
                        Some((kind, signal)) => self.handle_signal(kind, signal),
                        None => {
                            self.fail(
                                generation,
                                ConnectError::UnknownFailure("provider channel closed".into()),
                                TransitionCause::ProviderFailed,
                            );
                            break;
                        }
                    },
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
        .await;

        if waited.is_err() {
            self.fail(
                generation,
                ConnectError::Timeout(self.config.pairing_timeout_ms()),
                TransitionCause::TimedOut,
            );
        }
        self.settle(generation)
    }

    fn enter_degraded(
        &self,
        generation: u64,
        reason: ConnectError,
    ) -> Result<ConnectOutcome, ConnectError> {
        if !self.config.allow_degraded {
            self.fail(generation, reason, TransitionCause::ProviderFailed);
            return self.settle(generation);
        }

        let account = match WalletAddress::parse(self.config.degraded_account_id.as_str()) {
            Ok(account) => account,
            Err(err) => {
                self.fail(
                    generation,
                    ConnectError::UnknownFailure(err.to_string()),
                    TransitionCause::ProviderFailed,
                );
                return self.settle(generation);
            }
        };

        warn!(
            target = "wallet-connect",
            %account,
            %reason,
            "no wallet provider available; entering degraded mode"
        );
        let mut machine = self.machine.lock();
        if !machine.is_current(generation) {
            drop(machine);
            return self.settle(generation);
        }
        machine.active = Some(ProviderKind::Degraded);
        machine.connecting_started = None;
        self.apply(&mut machine, TransitionCause::DegradedFallback, |s| {
            s.state = ConnectionState::Connected;
            s.active_account_id = Some(account.clone());
            s.provider = Some(ProviderKind::Degraded);
            s.degraded = true;
            s.warning = Some(reason);
            s.attempt_count = 0;
            s.last_error = None;
            s.connecting_since = None;
        });
        Ok(ConnectOutcome::Connected {
            account,
            provider: ProviderKind::Degraded,
            degraded: true,
        })
    }

    fn settle(&self, generation: u64) -> Result<ConnectOutcome, ConnectError> {
        let snapshot = {
            let machine = self.machine.lock();
            if machine.generation != generation {
                return Ok(ConnectOutcome::Reset);
            }
            machine.snapshot.clone()
        };
        match (snapshot.state, snapshot.active_account_id) {
            (ConnectionState::Connected, Some(account)) => Ok(ConnectOutcome::Connected {
                account,
                provider: snapshot.provider.unwrap_or_else(|| self.primary.kind()),
                degraded: snapshot.degraded,
            }),
            (ConnectionState::Error, _) => Err(snapshot
                .last_error
                .unwrap_or_else(|| ConnectError::UnknownFailure("connection failed".into()))),
            (ConnectionState::Idle, _) => Ok(ConnectOutcome::Reset),
            (ConnectionState::Connecting, _) => Ok(ConnectOutcome::InProgress),
            (ConnectionState::Disconnected, _) | (ConnectionState::Connected, None) => Err(
                ConnectError::UnknownFailure("wallet disconnected before pairing finished".into()),
            ),
        }
    }

    /// Transition table for provider-sourced inputs.
    fn handle_signal(&self, kind: ProviderKind, signal: ProviderSignal) {
        let mut machine = self.machine.lock();
        if machine.active != Some(kind) {
            debug!(
                target = "wallet-connect",
                provider = %kind,
                ?signal,
                "ignoring signal from inactive provider"
            );
            return;
        }

        let state = machine.snapshot.state;
        match (state, signal) {
            (_, ProviderSignal::StatusChanged(message)) => {
                self.apply(&mut machine, TransitionCause::StatusChanged, |s| {
                    s.status_message = Some(message);
                });
            }
            (ConnectionState::Connecting, ProviderSignal::Paired { accounts }) => {
                let account = accounts
                    .iter()
                    .map(|raw| raw.trim())
                    .find(|raw| !raw.is_empty())
                    .and_then(|raw| WalletAddress::parse(raw).ok());
                match account {
                    Some(account) => {
                        info!(target = "wallet-connect", provider = %kind, %account, "wallet paired");
                        machine.connecting_started = None;
                        self.apply(&mut machine, TransitionCause::Paired, |s| {
                            s.state = ConnectionState::Connected;
                            s.active_account_id = Some(account);
                            s.provider = Some(kind);
                            s.degraded = false;
                            s.attempt_count = 0;
                            s.last_error = None;
                            s.connecting_since = None;
                            s.extended = false;
                            s.retry_available = false;
                        });
                    }
                    None => self.fail_locked(
                        &mut machine,
                        ConnectError::UnknownFailure("wallet returned no accounts".into()),
                        TransitionCause::ProviderFailed,
                    ),
                }
            }
            (ConnectionState::Connecting, ProviderSignal::Failed(err)) => {
                let classified = match classify(&err) {
                    ConnectError::Timeout(_) => {
                        ConnectError::Timeout(self.config.pairing_timeout_ms())
                    }
                    other => other,
                };
                self.fail_locked(&mut machine, classified, TransitionCause::ProviderFailed);
            }
            (ConnectionState::Connecting, ProviderSignal::Disconnected { reason }) => {
                let detail =
                    reason.unwrap_or_else(|| "wallet disconnected during pairing".to_string());
                self.fail_locked(
                    &mut machine,
                    ConnectError::UnknownFailure(detail),
                    TransitionCause::ProviderDisconnected,
                );
            }
            (ConnectionState::Connected, ProviderSignal::Disconnected { reason }) => {
                info!(target = "wallet-connect", provider = %kind, ?reason, "wallet disconnected");
                machine.active = None;
                self.apply(&mut machine, TransitionCause::ProviderDisconnected, |s| {
                    s.state = ConnectionState::Disconnected;
                    s.active_account_id = None;
                    s.provider = None;
                    s.status_message = reason;
                });
            }
            (state, signal) => {
                debug!(
                    target = "wallet-connect",
                    %state,
                    ?signal,
                    "signal has no effect in current state"
                );
            }
        }
    }

    /// Fail attempt `generation`; ignored once a reset or a newer connect
    /// has superseded it.
    fn fail(&self, generation: u64, error: ConnectError, cause: TransitionCause) {
        let mut machine = self.machine.lock();
        if machine.generation != generation {
            debug!(
                target = "wallet-connect",
                generation,
                current = machine.generation,
                %error,
                "dropping failure of a superseded attempt"
            );
            return;
        }
        self.fail_locked(&mut machine, error, cause);
    }

    fn fail_locked(&self, machine: &mut Machine, error: ConnectError, cause: TransitionCause) {
        if !machine.snapshot.is_connecting() {
            return;
        }
        let extended = machine
            .connecting_started
            .take()
            .map(|started| started.elapsed() > self.config.error_display_delay)
            .unwrap_or(false);
        let threshold = self.config.retry_after_failures;
        warn!(
            target = "wallet-connect",
            kind = error.kind().as_str(),
            %error,
            extended,
            "connection attempt failed"
        );
        machine.active = None;
        self.apply(machine, cause, |s| {
            s.state = ConnectionState::Error;
            s.last_error = Some(error);
            s.active_account_id = None;
            s.connecting_since = None;
            s.extended = extended;
            s.retry_available = extended || s.attempt_count > threshold;
        });
    }

    /// Single transition function. Rejects moves the table does not allow.
    fn apply<F>(
        &self,
        machine: &mut Machine,
        cause: TransitionCause,
        mutate: F,
    ) -> Option<ConnectionEvent>
    where
        F: FnOnce(&mut ConnectionSnapshot),
    {
        let from = machine.snapshot.state;
        let mut next = machine.snapshot.clone();
        mutate(&mut next);
        if from != next.state && !from.can_transition(next.state) {
            warn!(
                target = "wallet-connect",
                %from,
                to = %next.state,
                ?cause,
                "rejected illegal transition"
            );
            return None;
        }

        machine.seq += 1;
        machine.snapshot = next;
        let event = ConnectionEvent {
            seq: machine.seq,
            from,
            cause,
            snapshot: machine.snapshot.clone(),
            recorded_at: Utc::now(),
        };
        debug!(
            target = "wallet-connect",
            seq = event.seq,
            %from,
            to = %event.snapshot.state,
            cause = ?event.cause,
            attempt = event.snapshot.attempt_count,
            "connection transition"
        );
        if let Err(err) = self.bus.publish(event.clone()) {
            warn!(target = "wallet-connect", %err, "failed to publish connection event");
        }
        self.watch_tx.send_replace(event.snapshot.clone());
        Some(event)
    }
}
