use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wattgrid_settings::{load_settings_with_options, LoadOptions, SettingsSnapshot};

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Resolve which settings file to read.
///
/// Priority: explicit `--config` > ./config/wattgrid.yaml >
/// ~/.config/wattgrid/config.yaml. `None` means builtin defaults only.
pub fn settings_path(explicit: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("settings file not found: {}", path.display());
        }
        return Ok(Some(path.clone()));
    }

    let local = PathBuf::from("config/wattgrid.yaml");
    if local.exists() {
        return Ok(Some(local));
    }

    if let Some(mut path) = dirs::config_dir() {
        path.push("wattgrid");
        path.push("config.yaml");
        if path.exists() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

pub fn load_settings(path: Option<&Path>, overrides: &[String]) -> Result<SettingsSnapshot> {
    let options = LoadOptions {
        paths: path.map(Path::to_path_buf).into_iter().collect(),
        include_env: true,
        cli_overrides: overrides.to_vec(),
    };
    let snapshot = load_settings_with_options(&options).context("Failed to load settings")?;
    match path {
        Some(path) => info!("Loaded settings from: {}", path.display()),
        None => debug!("No settings file found, using defaults"),
    }
    Ok(snapshot)
}
