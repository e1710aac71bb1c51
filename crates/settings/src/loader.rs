use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::defaults::default_snapshot;
use crate::errors::SettingsError;
use crate::model::{SettingSource, SettingsSnapshot};
use crate::overrides::{apply_setting, SUPPORTED_PATHS};

const ENV_PREFIX: &str = "WATTGRID__";
const ENV_JSON: &str = "WATTGRID_SETTINGS_JSON";

#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
    /// `path=value` pairs, applied last.
    pub cli_overrides: Vec<String>,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
            cli_overrides: Vec::new(),
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<SettingsSnapshot, SettingsError> {
    let mut options = LoadOptions {
        include_env: true,
        ..LoadOptions::default()
    };
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    load_settings_with_options(&options)
}

pub fn load_settings_with_options(
    options: &LoadOptions,
) -> Result<SettingsSnapshot, SettingsError> {
    let mut snapshot = default_snapshot();
    for path in SUPPORTED_PATHS {
        snapshot.set_provenance(path, SettingSource::Builtin);
    }

    for path in &options.paths {
        if path.exists() {
            let overlays = overlays_from_file(path)?;
            debug!(path = %path.display(), count = overlays.len(), "settings file overlays");
            apply_overlays(&mut snapshot, overlays)?;
        } else {
            debug!(path = %path.display(), "settings file not found; skipping");
        }
    }

    if options.include_env {
        apply_overlays(&mut snapshot, overlays_from_env()?)?;
    }

    apply_overlays(&mut snapshot, overlays_from_cli(&options.cli_overrides)?)?;

    Ok(snapshot)
}

struct SettingOverlay {
    path: String,
    value: Value,
    source: SettingSource,
}

fn apply_overlays(
    snapshot: &mut SettingsSnapshot,
    overlays: Vec<SettingOverlay>,
) -> Result<(), SettingsError> {
    if overlays.is_empty() {
        return Ok(());
    }
    for overlay in overlays {
        apply_setting(snapshot, &overlay.path, &overlay.value, overlay.source)?;
    }
    snapshot.rev = snapshot.rev.saturating_add(1);
    Ok(())
}

fn overlays_from_file(path: &Path) -> Result<Vec<SettingOverlay>, SettingsError> {
    let content = fs::read_to_string(path).map_err(|err| SettingsError::Io(format!("{}", err)))?;
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| SettingsError::Invalid(format!("{}", err)))?;
    let json_value = serde_json::to_value(yaml_value)
        .map_err(|err| SettingsError::Invalid(format!("{}", err)))?;
    Ok(flatten_value(json_value, None, SettingSource::File))
}

fn overlays_from_env() -> Result<Vec<SettingOverlay>, SettingsError> {
    let mut overlays = Vec::new();
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            overlays.push(SettingOverlay {
                path,
                value: parse_scalar(&raw),
                source: SettingSource::Env,
            });
        }
    }

    if let Ok(raw_json) = env::var(ENV_JSON) {
        if !raw_json.trim().is_empty() {
            let json_value: Value = serde_json::from_str(&raw_json)
                .map_err(|err| SettingsError::Invalid(format!("{ENV_JSON}: {err}")))?;
            overlays.extend(flatten_value(json_value, None, SettingSource::Env));
        }
    }

    Ok(overlays)
}

fn overlays_from_cli(pairs: &[String]) -> Result<Vec<SettingOverlay>, SettingsError> {
    let mut overlays = Vec::new();
    for token in pairs {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((path, value_raw)) = trimmed.split_once('=') else {
            return Err(SettingsError::Invalid(format!(
                "expected path=value, got '{trimmed}'"
            )));
        };
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        overlays.push(SettingOverlay {
            path: path.to_ascii_lowercase(),
            value: parse_scalar(value_raw.trim()),
            source: SettingSource::Cli,
        });
    }
    Ok(overlays)
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    Value::String(raw.to_string())
}

fn flatten_value(
    value: Value,
    prefix: Option<String>,
    source: SettingSource,
) -> Vec<SettingOverlay> {
    match value {
        Value::Object(map) => {
            let mut result = Vec::new();
            for (key, value) in map {
                let key_segment = key.trim().to_ascii_lowercase();
                let next_prefix = match &prefix {
                    Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, key_segment),
                    _ => key_segment,
                };
                result.extend(flatten_value(value, Some(next_prefix), source));
            }
            result
        }
        other => match prefix {
            Some(path) => vec![SettingOverlay {
                path,
                value: other,
                source,
            }],
            None => Vec::new(),
        },
    }
}
