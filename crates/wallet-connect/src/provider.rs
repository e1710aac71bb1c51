use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;
use wattgrid_core_types::ProviderKind;

use crate::errors::ProviderError;

/// Notification pushed by a provider after `initiate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderSignal {
    /// Pairing/login succeeded. Accounts in wallet order.
    Paired { accounts: Vec<String> },
    Disconnected { reason: Option<String> },
    StatusChanged(String),
    Failed(ProviderError),
}

pub(crate) type TaggedSignal = (ProviderKind, ProviderSignal);

/// Channel a provider reports through. Stands in for the paired,
/// disconnected and status-changed callbacks of a wallet SDK.
#[derive(Clone, Debug)]
pub struct SignalSink {
    kind: ProviderKind,
    tx: mpsc::UnboundedSender<TaggedSignal>,
}

impl SignalSink {
    pub(crate) fn new(kind: ProviderKind, tx: mpsc::UnboundedSender<TaggedSignal>) -> Self {
        Self { kind, tx }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn paired<I, S>(&self, accounts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(ProviderSignal::Paired {
            accounts: accounts.into_iter().map(Into::into).collect(),
        });
    }

    pub fn disconnected(&self, reason: Option<String>) {
        self.send(ProviderSignal::Disconnected { reason });
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(ProviderSignal::StatusChanged(message.into()));
    }

    pub fn failed(&self, err: ProviderError) {
        self.send(ProviderSignal::Failed(err));
    }

    pub fn send(&self, signal: ProviderSignal) {
        if self.tx.send((self.kind, signal)).is_err() {
            debug!(provider = %self.kind, "orchestrator gone; dropping provider signal");
        }
    }
}

/// Capability set every wallet connection provider offers.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Install the sink the provider reports pairing, disconnection and
    /// status changes through. Called once by the orchestrator.
    fn bind(&self, sink: SignalSink);

    /// Start the handshake. A provider that cannot run in this environment
    /// returns [`ProviderError::MissingRuntime`].
    async fn initiate(&self) -> Result<(), ProviderError>;

    /// Release the session. Must not emit further signals.
    async fn teardown(&self);
}
