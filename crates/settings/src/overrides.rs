use serde_json::Value;
use wattgrid_core_types::{ProviderKind, Role};

use crate::errors::SettingsError;
use crate::model::{AssignmentStrategy, SettingSource, SettingsSnapshot};

/// Every dotted path `apply_setting` understands.
pub const SUPPORTED_PATHS: &[&str] = &[
    "connection.init_timeout_ms",
    "connection.pairing_timeout_ms",
    "connection.error_display_delay_ms",
    "connection.retry_after_failures",
    "providers.primary",
    "providers.fallback",
    "providers.allow_degraded",
    "providers.degraded_account_id",
    "providers.relay_url",
    "providers.network",
    "identity.assignment",
    "identity.default_role",
    "identity.catalog_path",
];

/// Apply one `path = value` overlay and record where it came from.
pub fn apply_setting(
    snapshot: &mut SettingsSnapshot,
    path: &str,
    value: &Value,
    source: SettingSource,
) -> Result<(), SettingsError> {
    match path {
        "connection.init_timeout_ms" => {
            snapshot.connection.init_timeout_ms = to_millis(path, value)?
        }
        "connection.pairing_timeout_ms" => {
            snapshot.connection.pairing_timeout_ms = to_millis(path, value)?
        }
        "connection.error_display_delay_ms" => {
            snapshot.connection.error_display_delay_ms = to_millis(path, value)?
        }
        "connection.retry_after_failures" => {
            snapshot.connection.retry_after_failures = to_u32(path, value)?
        }
        "providers.primary" => {
            let kind = to_provider(path, value)?;
            if kind == ProviderKind::Degraded {
                return Err(invalid(path, "degraded mode cannot be the primary provider"));
            }
            snapshot.providers.primary = kind;
        }
        "providers.fallback" => {
            snapshot.providers.fallback = match value {
                Value::Null => None,
                Value::String(raw) if raw.eq_ignore_ascii_case("none") => None,
                other => Some(to_provider(path, other)?),
            }
        }
        "providers.allow_degraded" => snapshot.providers.allow_degraded = to_bool(path, value)?,
        "providers.degraded_account_id" => {
            let raw = to_string(path, value)?;
            if raw.trim().is_empty() {
                return Err(invalid(path, "placeholder account id cannot be empty"));
            }
            snapshot.providers.degraded_account_id = raw;
        }
        "providers.relay_url" => snapshot.providers.relay_url = to_string(path, value)?,
        "providers.network" => snapshot.providers.network = to_string(path, value)?,
        "identity.assignment" => snapshot.identity.assignment = to_strategy(path, value)?,
        "identity.default_role" => {
            let raw = to_string(path, value)?;
            snapshot.identity.default_role = raw
                .parse::<Role>()
                .map_err(|err| invalid(path, &err.to_string()))?;
        }
        "identity.catalog_path" => {
            snapshot.identity.catalog_path = match value {
                Value::Null => None,
                other => Some(to_string(path, other)?),
            }
        }
        other => return Err(SettingsError::UnsupportedPath(other.to_string())),
    }
    snapshot.set_provenance(path, source);
    Ok(())
}

fn invalid(path: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Accepts plain milliseconds or a humantime string such as `"3s"`.
fn to_millis(path: &str, value: &Value) -> Result<u64, SettingsError> {
    match value {
        Value::Number(num) => num
            .as_u64()
            .ok_or_else(|| invalid(path, &format!("expected non-negative integer, got {num}"))),
        Value::String(raw) => {
            if let Ok(ms) = raw.trim().parse::<u64>() {
                return Ok(ms);
            }
            humantime::parse_duration(raw.trim())
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .map_err(|err| invalid(path, &format!("invalid duration '{raw}': {err}")))
        }
        other => Err(invalid(path, &format!("expected duration, got {other}"))),
    }
}

fn to_u32(path: &str, value: &Value) -> Result<u32, SettingsError> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| invalid(path, &format!("expected small integer, got {value}")))
}

fn to_bool(path: &str, value: &Value) -> Result<bool, SettingsError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(raw) => raw
            .trim()
            .parse::<bool>()
            .map_err(|_| invalid(path, &format!("expected bool, got '{raw}'"))),
        other => Err(invalid(path, &format!("expected bool, got {other}"))),
    }
}

fn to_string(path: &str, value: &Value) -> Result<String, SettingsError> {
    match value {
        Value::String(raw) => Ok(raw.clone()),
        Value::Number(num) => Ok(num.to_string()),
        other => Err(invalid(path, &format!("expected string, got {other}"))),
    }
}

fn to_provider(path: &str, value: &Value) -> Result<ProviderKind, SettingsError> {
    to_string(path, value)?
        .parse::<ProviderKind>()
        .map_err(|err| invalid(path, &err.to_string()))
}

fn to_strategy(path: &str, value: &Value) -> Result<AssignmentStrategy, SettingsError> {
    serde_json::from_value(value.clone())
        .map_err(|_| invalid(path, &format!("expected fixed|address_hash|random, got {value}")))
}
