use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use tracing::{debug, info};
use uuid::Uuid;
use wattgrid_core_types::ProviderKind;

use super::PairingBehaviour;
use crate::errors::{ProviderError, USER_REJECTED_CODE};
use crate::provider::{ConnectionProvider, SignalSink};

/// Pairing offer rendered as a QR code for the remote wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayPairing {
    pub topic: String,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RelaySession {
    pairing: Option<RelayPairing>,
    accounts: Option<Vec<String>>,
}

/// QR / relay pairing with a wallet on another device.
pub struct RelayProvider {
    relay_url: String,
    network: String,
    behaviour: Mutex<PairingBehaviour>,
    sink: Mutex<Option<SignalSink>>,
    session: Mutex<RelaySession>,
}

impl RelayProvider {
    pub fn new(
        relay_url: impl Into<String>,
        network: impl Into<String>,
        behaviour: PairingBehaviour,
    ) -> Arc<Self> {
        Arc::new(Self {
            relay_url: relay_url.into(),
            network: network.into(),
            behaviour: Mutex::new(behaviour),
            sink: Mutex::new(None),
            session: Mutex::new(RelaySession::default()),
        })
    }

    pub fn set_behaviour(&self, behaviour: PairingBehaviour) {
        *self.behaviour.lock() = behaviour;
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Current QR offer, if a pairing is pending.
    pub fn pairing(&self) -> Option<RelayPairing> {
        self.session.lock().pairing.clone()
    }

    pub fn is_paired(&self) -> bool {
        self.session.lock().accounts.is_some()
    }

    /// Remote wallet approves. Accepts CAIP-10 account strings.
    pub fn approve<I, S>(&self, accounts: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accounts: Vec<String> = accounts
            .into_iter()
            .map(|raw| {
                let raw: String = raw.into();
                normalize_account(&raw)
            })
            .collect();
        {
            let mut session = self.session.lock();
            if session.pairing.take().is_none() {
                return false;
            }
            session.accounts = Some(accounts.clone());
        }
        self.emit(|sink| sink.paired(accounts));
        true
    }

    pub fn reject(&self) -> bool {
        if self.session.lock().pairing.take().is_none() {
            return false;
        }
        self.emit(|sink| {
            sink.failed(ProviderError::Rejected {
                code: USER_REJECTED_CODE,
                message: "Pairing proposal rejected by wallet".into(),
            })
        });
        true
    }

    /// The pairing offer lapsed without an answer.
    pub fn expire(&self) -> bool {
        if self.session.lock().pairing.take().is_none() {
            return false;
        }
        self.emit(|sink| sink.failed(ProviderError::Expired));
        true
    }

    pub fn disconnect(&self, reason: Option<String>) -> bool {
        if self.session.lock().accounts.take().is_none() {
            return false;
        }
        self.emit(|sink| sink.disconnected(reason));
        true
    }

    fn emit(&self, f: impl FnOnce(&SignalSink)) {
        match self.sink.lock().as_ref() {
            Some(sink) => f(sink),
            None => debug!(provider = "relay", "no sink bound; signal dropped"),
        }
    }
}

#[async_trait]
impl ConnectionProvider for RelayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Relay
    }

    fn bind(&self, sink: SignalSink) {
        *self.sink.lock() = Some(sink);
    }

    async fn initiate(&self) -> Result<(), ProviderError> {
        let url = self.relay_url.trim();
        if url.is_empty() {
            return Err(ProviderError::MissingRuntime(
                "no relay endpoint configured".into(),
            ));
        }
        if !(url.starts_with("wss://") || url.starts_with("ws://")) {
            return Err(ProviderError::Transport(format!(
                "unsupported relay url '{url}'"
            )));
        }

        let pairing = new_pairing();
        info!(topic = %pairing.topic, relay = %url, "relay pairing offer created");
        {
            let mut session = self.session.lock();
            session.pairing = Some(pairing.clone());
            session.accounts = None;
        }
        self.emit(|sink| sink.status(format!("Scan to pair: {}", pairing.uri)));

        let behaviour = self.behaviour.lock().clone();
        match behaviour {
            PairingBehaviour::AutoApprove(accounts) => {
                self.approve(accounts);
            }
            PairingBehaviour::Reject => {
                self.reject();
            }
            PairingBehaviour::Expire => {
                self.expire();
            }
            PairingBehaviour::Manual => {}
        }
        Ok(())
    }

    async fn teardown(&self) {
        let mut session = self.session.lock();
        session.pairing = None;
        session.accounts = None;
    }
}

fn new_pairing() -> RelayPairing {
    let topic = Uuid::new_v4().simple().to_string();
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    RelayPairing {
        uri: format!(
            "wc:{topic}@2?relay-protocol=irn&symKey={}",
            hex::encode(key)
        ),
        topic,
        created_at: Utc::now(),
    }
}

/// Strip a CAIP-10 `namespace:chain:account` prefix down to the account.
pub fn normalize_account(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.splitn(3, ':').collect::<Vec<_>>().as_slice() {
        [_namespace, _chain, account] => account.trim().to_string(),
        _ => trimmed.to_string(),
    }
}
