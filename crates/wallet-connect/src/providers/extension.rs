use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};
use wattgrid_core_types::ProviderKind;

use super::PairingBehaviour;
use crate::errors::{ProviderError, USER_REJECTED_CODE};
use crate::provider::{ConnectionProvider, SignalSink};

#[derive(Debug, Default)]
struct ExtensionSession {
    pending: bool,
    accounts: Option<Vec<String>>,
}

/// Browser-extension style wallet injected into the page.
pub struct ExtensionProvider {
    app_name: String,
    installed: AtomicBool,
    behaviour: Mutex<PairingBehaviour>,
    sink: Mutex<Option<SignalSink>>,
    session: Mutex<ExtensionSession>,
}

impl ExtensionProvider {
    pub fn new(app_name: impl Into<String>, behaviour: PairingBehaviour) -> Arc<Self> {
        Arc::new(Self {
            app_name: app_name.into(),
            installed: AtomicBool::new(true),
            behaviour: Mutex::new(behaviour),
            sink: Mutex::new(None),
            session: Mutex::new(ExtensionSession::default()),
        })
    }

    /// A provider whose extension is not installed.
    pub fn missing(app_name: impl Into<String>) -> Arc<Self> {
        let provider = Self::new(app_name, PairingBehaviour::Manual);
        provider.installed.store(false, Ordering::SeqCst);
        provider
    }

    pub fn set_installed(&self, installed: bool) {
        self.installed.store(installed, Ordering::SeqCst);
    }

    pub fn set_behaviour(&self, behaviour: PairingBehaviour) {
        *self.behaviour.lock() = behaviour;
    }

    pub fn is_paired(&self) -> bool {
        self.session.lock().accounts.is_some()
    }

    /// Wallet side approves the pending request.
    pub fn approve<I, S>(&self, accounts: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accounts: Vec<String> = accounts.into_iter().map(Into::into).collect();
        {
            let mut session = self.session.lock();
            if !session.pending {
                return false;
            }
            session.pending = false;
            session.accounts = Some(accounts.clone());
        }
        self.emit(|sink| sink.paired(accounts));
        true
    }

    /// Wallet side declines the pending request.
    pub fn reject(&self) -> bool {
        {
            let mut session = self.session.lock();
            if !session.pending {
                return false;
            }
            session.pending = false;
        }
        self.emit(|sink| {
            sink.failed(ProviderError::Rejected {
                code: USER_REJECTED_CODE,
                message: "User rejected the request.".into(),
            })
        });
        true
    }

    /// Wallet side ends an established session (locked wallet, revoked site).
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
            None => debug!(provider = "extension", "no sink bound; signal dropped"),
        }
    }
}

#[async_trait]
impl ConnectionProvider for ExtensionProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Extension
    }

    fn bind(&self, sink: SignalSink) {
        *self.sink.lock() = Some(sink);
    }

    async fn initiate(&self) -> Result<(), ProviderError> {
        if !self.installed.load(Ordering::SeqCst) {
            return Err(ProviderError::MissingRuntime(
                "no wallet extension detected in this browser".into(),
            ));
        }

        {
            let mut session = self.session.lock();
            session.pending = true;
            session.accounts = None;
        }
        info!(app = %self.app_name, "requesting pairing from wallet extension");
        self.emit(|sink| sink.status("Waiting for approval in your wallet extension"));

        let behaviour = self.behaviour.lock().clone();
        match behaviour {
            PairingBehaviour::AutoApprove(accounts) => {
                self.approve(accounts);
            }
            PairingBehaviour::Reject => {
                self.reject();
            }
            PairingBehaviour::Expire => {
                self.session.lock().pending = false;
                self.emit(|sink| sink.failed(ProviderError::Expired));
            }
            PairingBehaviour::Manual => {}
        }
        Ok(())
    }

    async fn teardown(&self) {
        let mut session = self.session.lock();
        session.pending = false;
        session.accounts = None;
    }
}
