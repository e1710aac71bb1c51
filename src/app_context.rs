//! Application context.
//!
//! Wires settings, the permission catalog, the identity store, both wallet
//! providers, the connection orchestrator and the identity binder into one
//! shared set of components.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use wattgrid_core_types::ProviderKind;
use wattgrid_identity_binder::{assigner_for, IdentityBinder, RoleAssigner};
use wattgrid_identity_store::{AuthorizationEngine, Clock, IdentityStore, SystemClock};
use wattgrid_permission_catalog::{load_catalog_from_path, ConfigError, PermissionCatalog};
use wattgrid_settings::SettingsSnapshot;
use wattgrid_wallet_connect::{
    ConnectionOrchestrator, ConnectionProvider, ExtensionProvider, OrchestratorConfig,
    PairingBehaviour, RelayProvider,
};

const APP_NAME: &str = "wattgrid";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to load permission catalog from {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

/// Knobs for the simulated wallet side and test seams.
#[derive(Clone)]
pub struct ContextOptions {
    /// How both simulated wallets answer pairing requests.
    pub behaviour: PairingBehaviour,
    pub extension_installed: bool,
    pub clock: Arc<dyn Clock>,
    /// Overrides the assigner chosen by `identity.assignment`.
    pub assigner: Option<Arc<dyn RoleAssigner>>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            behaviour: PairingBehaviour::Manual,
            extension_installed: true,
            clock: Arc::new(SystemClock),
            assigner: None,
        }
    }
}

pub struct AppContext {
    settings: Arc<SettingsSnapshot>,
    store: Arc<IdentityStore>,
    authz: AuthorizationEngine,
    extension: Arc<ExtensionProvider>,
    relay: Arc<RelayProvider>,
    orchestrator: Arc<ConnectionOrchestrator>,
    binder: Arc<IdentityBinder>,
}

impl AppContext {
    pub fn new(settings: SettingsSnapshot, options: ContextOptions) -> Result<Self, ContextError> {
        let catalog = load_catalog(&settings)?;
        let store = Arc::new(IdentityStore::with_clock(catalog, options.clock));
        let authz = AuthorizationEngine::new(Arc::clone(&store));

        let extension = ExtensionProvider::new(APP_NAME, options.behaviour.clone());
        extension.set_installed(options.extension_installed);
        let relay = RelayProvider::new(
            settings.providers.relay_url.clone(),
            settings.providers.network.clone(),
            options.behaviour,
        );

        let pick = |kind: ProviderKind| -> Option<Arc<dyn ConnectionProvider>> {
            match kind {
                ProviderKind::Extension => Some(extension.clone() as Arc<dyn ConnectionProvider>),
                ProviderKind::Relay => Some(relay.clone() as Arc<dyn ConnectionProvider>),
                ProviderKind::Degraded => None,
            }
        };
        let primary = pick(settings.providers.primary)
            .unwrap_or_else(|| extension.clone() as Arc<dyn ConnectionProvider>);
        let fallback = settings
            .providers
            .fallback
            .filter(|kind| *kind != primary.kind())
            .and_then(pick);

        info!(
            primary = %primary.kind(),
            fallback = ?fallback.as_ref().map(|provider| provider.kind()),
            allow_degraded = settings.providers.allow_degraded,
            "wallet providers configured"
        );
        let orchestrator = ConnectionOrchestrator::new(
            primary,
            fallback,
            OrchestratorConfig::from_settings(&settings),
        );

        let assigner = options.assigner.unwrap_or_else(|| {
            assigner_for(
                settings.identity.assignment,
                settings.identity.default_role,
            )
        });
        debug!(assigner = assigner.name(), "role assigner selected");
        let binder = IdentityBinder::new(Arc::clone(&store), assigner, &orchestrator);

        Ok(Self {
            settings: Arc::new(settings),
            store,
            authz,
            extension,
            relay,
            orchestrator,
            binder,
        })
    }

    pub fn settings(&self) -> &SettingsSnapshot {
        &self.settings
    }

    pub fn store(&self) -> Arc<IdentityStore> {
        Arc::clone(&self.store)
    }

    pub fn authorization(&self) -> &AuthorizationEngine {
        &self.authz
    }

    pub fn extension(&self) -> Arc<ExtensionProvider> {
        Arc::clone(&self.extension)
    }

    pub fn relay(&self) -> Arc<RelayProvider> {
        Arc::clone(&self.relay)
    }

    pub fn orchestrator(&self) -> Arc<ConnectionOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn binder(&self) -> Arc<IdentityBinder> {
        Arc::clone(&self.binder)
    }
}

fn load_catalog(settings: &SettingsSnapshot) -> Result<PermissionCatalog, ContextError> {
    let Some(raw) = settings.identity.catalog_path.as_deref() else {
        return Ok(PermissionCatalog::builtin());
    };
    let path = PathBuf::from(raw);
    let catalog = load_catalog_from_path(&path)
        .and_then(|file| PermissionCatalog::from_file(&file))
        .map_err(|source| ContextError::Catalog {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), revision = catalog.revision(), "permission catalog loaded");
    Ok(catalog)
}
