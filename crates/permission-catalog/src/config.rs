//! Catalog file definitions and loaders.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// On-disk catalog definition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CatalogFile {
    pub version: u32,
    pub roles: RoleGrants,
}

/// Grants per role. Both roles are required fields, so a file that omits one
/// fails to deserialize instead of producing a partial catalog.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoleGrants {
    pub prosumer: Vec<PermissionEntry>,
    pub viewer: Vec<PermissionEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PermissionEntry {
    pub action: String,
    pub resource: String,
    #[serde(default = "default_allowed")]
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_allowed() -> bool {
    true
}

impl PermissionEntry {
    fn allow(action: &str, resource: &str) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            allowed: true,
            notes: None,
        }
    }

    fn deny(action: &str, resource: &str, notes: &str) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            allowed: false,
            notes: Some(notes.into()),
        }
    }
}

/// Errors surfaced while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize catalog: {0}")]
    Deserialize(String),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

pub fn load_catalog_from_reader<R: Read>(mut reader: R) -> Result<CatalogFile, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_catalog_str(&buf)
}

pub fn load_catalog_from_path(path: impl AsRef<Path>) -> Result<CatalogFile, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_catalog_from_reader(file)
}

pub fn parse_catalog_str(raw: &str) -> Result<CatalogFile, ConfigError> {
    match serde_json::from_str(raw) {
        Ok(catalog) => Ok(catalog),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}

/// Builtin energy-market catalog used when no catalog file is configured.
pub fn default_catalog_file() -> CatalogFile {
    CatalogFile {
        version: 1,
        roles: RoleGrants {
            prosumer: vec![
                PermissionEntry::allow("view", "dashboard"),
                PermissionEntry::allow("view", "market"),
                PermissionEntry::allow("view", "meter"),
                PermissionEntry::allow("buy", "energy"),
                PermissionEntry::allow("sell", "energy"),
                PermissionEntry::allow("create", "listing"),
                PermissionEntry::allow("cancel", "listing"),
                PermissionEntry::allow("manage", "profile"),
            ],
            viewer: vec![
                PermissionEntry::allow("view", "dashboard"),
                PermissionEntry::allow("view", "market"),
                PermissionEntry::allow("manage", "profile"),
                PermissionEntry::deny("buy", "energy", "viewers cannot trade"),
                PermissionEntry::deny("sell", "energy", "viewers cannot trade"),
                PermissionEntry::deny("create", "listing", "viewers cannot list offers"),
            ],
        },
    }
}
