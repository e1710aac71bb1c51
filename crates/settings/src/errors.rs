use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("unsupported settings path: {0}")]
    UnsupportedPath(String),
    #[error("invalid value for {path}: {reason}")]
    InvalidValue { path: String, reason: String },
}
