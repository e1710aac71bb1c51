use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Shared error type for the wattgrid core crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WattError {
    #[error("{message}")]
    Message { message: String },
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl WattError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Wallet account identifier. Case-sensitive and never empty.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: impl Into<String>) -> Result<Self, WattError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(WattError::InvalidAddress(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for WalletAddress {
    type Err = WattError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = WattError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// Closed set of marketplace roles.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Role {
    Prosumer,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Prosumer, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Prosumer => "prosumer",
            Role::Viewer => "viewer",
        }
    }

    /// Human readable label used by dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Prosumer => "Prosumer",
            Role::Viewer => "Viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WattError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WattError::UnknownRole(s.to_string()))
    }
}

/// Which wallet connection capability produced a connection.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProviderKind {
    /// Browser-extension wallet injected into the page.
    Extension,
    /// QR code / relay pairing with a remote wallet.
    Relay,
    /// Placeholder identity used when no real provider is available.
    Degraded,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Extension => "extension",
            ProviderKind::Relay => "relay",
            ProviderKind::Degraded => "degraded",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = WattError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extension" => Ok(ProviderKind::Extension),
            "relay" => Ok(ProviderKind::Relay),
            "degraded" => Ok(ProviderKind::Degraded),
            other => Err(WattError::UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_address_rejects_blank_input() {
        assert!(WalletAddress::parse("").is_err());
        assert!(WalletAddress::parse("   ").is_err());
        assert_eq!(WalletAddress::parse("0xAAA").unwrap().as_str(), "0xAAA");
    }

    #[test]
    fn wallet_address_is_case_sensitive() {
        let upper = WalletAddress::parse("0xAAA").unwrap();
        let lower = WalletAddress::parse("0xaaa").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn role_parses_loosely_and_prints_lowercase() {
        assert_eq!("Prosumer".parse::<Role>().unwrap(), Role::Prosumer);
        assert_eq!(" viewer ".parse::<Role>().unwrap(), Role::Viewer);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Viewer.to_string(), "viewer");
    }

    #[test]
    fn provider_kind_round_trips_through_str() {
        for kind in [
            ProviderKind::Extension,
            ProviderKind::Relay,
            ProviderKind::Degraded,
        ] {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[cfg(feature = "serde-full")]
    #[test]
    fn serde_rejects_empty_address() {
        let parsed: Result<WalletAddress, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
        let role: Role = serde_json::from_str("\"prosumer\"").unwrap();
        assert_eq!(role, Role::Prosumer);
    }
}
