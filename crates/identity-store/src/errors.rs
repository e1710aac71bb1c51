use thiserror::Error;
use wattgrid_core_types::WalletAddress;

/// Failures inside the store. These never cross the public store API; the
/// operations that can hit them return `Option` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown wallet address: {0}")]
    UnknownWalletAddress(WalletAddress),
}
