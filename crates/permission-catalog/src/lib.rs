pub mod config;

pub use crate::config::{
    default_catalog_file, load_catalog_from_path, load_catalog_from_reader, parse_catalog_str,
    CatalogFile, ConfigError, PermissionEntry, RoleGrants,
};

use std::collections::HashSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wattgrid_core_types::Role;

/// Single authorization fact. Matching is exact and case-sensitive.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub action: String,
    pub resource: String,
    pub allowed: bool,
}

impl Permission {
    pub fn allow(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            allowed: true,
        }
    }

    pub fn deny(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            allowed: false,
        }
    }

    pub fn matches(&self, action: &str, resource: &str) -> bool {
        self.action == action && self.resource == resource
    }
}

impl From<&PermissionEntry> for Permission {
    fn from(entry: &PermissionEntry) -> Self {
        Self {
            action: entry.action.clone(),
            resource: entry.resource.clone(),
            allowed: entry.allowed,
        }
    }
}

/// Static role -> permission mapping.
///
/// One field per role keeps `permissions_for` total over [`Role`]: adding a
/// role without a catalog entry does not compile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionCatalog {
    revision: u64,
    prosumer: Vec<Permission>,
    viewer: Vec<Permission>,
}

impl PermissionCatalog {
    pub fn builtin() -> Self {
        match Self::from_file(&default_catalog_file()) {
            Ok(catalog) => catalog,
            Err(err) => unreachable!("builtin catalog is invalid: {err}"),
        }
    }

    pub fn from_file(file: &CatalogFile) -> Result<Self, ConfigError> {
        let prosumer = convert_role(Role::Prosumer, &file.roles.prosumer)?;
        let viewer = convert_role(Role::Viewer, &file.roles.viewer)?;
        debug!(
            target = "permission-catalog",
            version = file.version,
            prosumer = prosumer.len(),
            viewer = viewer.len(),
            "catalog loaded"
        );
        Ok(Self {
            revision: u64::from(file.version),
            prosumer,
            viewer,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Ordered permission set for `role`.
    pub fn permissions_for(&self, role: Role) -> Vec<Permission> {
        self.grants(role).to_vec()
    }

    pub fn grants(&self, role: Role) -> &[Permission] {
        match role {
            Role::Prosumer => &self.prosumer,
            Role::Viewer => &self.viewer,
        }
    }

    pub fn to_file(&self) -> CatalogFile {
        let entries = |perms: &[Permission]| {
            perms
                .iter()
                .map(|perm| PermissionEntry {
                    action: perm.action.clone(),
                    resource: perm.resource.clone(),
                    allowed: perm.allowed,
                    notes: None,
                })
                .collect()
        };
        CatalogFile {
            version: u32::try_from(self.revision).unwrap_or(u32::MAX),
            roles: RoleGrants {
                prosumer: entries(&self.prosumer),
                viewer: entries(&self.viewer),
            },
        }
    }
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn convert_role(role: Role, entries: &[PermissionEntry]) -> Result<Vec<Permission>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.action.trim().is_empty() || entry.resource.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "role '{role}' has an entry with an empty action or resource"
            )));
        }
        if !seen.insert((entry.action.as_str(), entry.resource.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "role '{role}' lists '{} {}' more than once",
                entry.action, entry.resource
            )));
        }
        out.push(Permission::from(entry));
    }
    Ok(out)
}

/// Permissions for `role` from the builtin catalog.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    static BUILTIN: OnceLock<PermissionCatalog> = OnceLock::new();
    BUILTIN
        .get_or_init(PermissionCatalog::builtin)
        .permissions_for(role)
}
