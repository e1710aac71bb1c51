use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 / wallet-standard code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Failures as reported by a concrete provider. Never exposed past the
/// orchestrator; see [`classify`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("runtime support missing: {0}")]
    MissingRuntime(String),
    #[error("request rejected (code {code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("pairing request expired")]
    Expired,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{0}")]
    Other(String),
}

/// Connection failure taxonomy surfaced to the UI layer.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConnectError {
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("pairing request was cancelled by the user")]
    UserCancelled,
    #[error("wallet provider did not respond within {0}ms")]
    Timeout(u64),
    #[error("wallet connection failed: {0}")]
    UnknownFailure(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderUnavailable,
    UserCancelled,
    Timeout,
    UnknownFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::UserCancelled => "user_cancelled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UnknownFailure => "unknown_failure",
        }
    }
}

impl ConnectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            ConnectError::UserCancelled => ErrorKind::UserCancelled,
            ConnectError::Timeout(_) => ErrorKind::Timeout,
            ConnectError::UnknownFailure(_) => ErrorKind::UnknownFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectError::Timeout(_) | ConnectError::UnknownFailure(_)
        )
    }

    /// Inline message keyed by error kind.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::ProviderUnavailable => {
                "No wallet was detected. Running with a demo account."
            }
            ErrorKind::UserCancelled => "Connection request was rejected in your wallet.",
            ErrorKind::Timeout => "Your wallet did not respond in time. Please try again.",
            ErrorKind::UnknownFailure => "Could not connect to your wallet. Please try again.",
        }
    }
}

/// Map a raw provider failure onto the public taxonomy.
pub fn classify(err: &ProviderError) -> ConnectError {
    match err {
        ProviderError::MissingRuntime(reason) => ConnectError::ProviderUnavailable(reason.clone()),
        ProviderError::Rejected { .. } => ConnectError::UserCancelled,
        ProviderError::Expired => ConnectError::Timeout(0),
        ProviderError::Transport(message) | ProviderError::Other(message) => {
            classify_message(message)
        }
    }
}

fn classify_message(message: &str) -> ConnectError {
    let lowered = message.to_ascii_lowercase();
    if ["reject", "denied", "cancel", "4001"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        ConnectError::UserCancelled
    } else if lowered.contains("timeout")
        || lowered.contains("timed out")
        || lowered.contains("expired")
    {
        ConnectError::Timeout(0)
    } else if lowered.contains("not installed") || lowered.contains("not available") {
        ConnectError::ProviderUnavailable(message.to_string())
    } else {
        ConnectError::UnknownFailure(message.to_string())
    }
}
