use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use wattgrid_settings::SettingsSnapshot;

use super::output::OutputFormat;
use crate::app_context::{AppContext, ContextOptions};

pub struct CliContext {
    settings: Arc<SettingsSnapshot>,
    settings_path: Option<PathBuf>,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(
        settings: SettingsSnapshot,
        settings_path: Option<PathBuf>,
        output: OutputFormat,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            settings_path,
            output,
        }
    }

    pub fn settings(&self) -> &SettingsSnapshot {
        self.settings.as_ref()
    }

    pub fn settings_path(&self) -> Option<&Path> {
        self.settings_path.as_deref()
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Fresh application context; every command gets its own store.
    pub fn app_context(&self, options: ContextOptions) -> Result<AppContext> {
        self.app_context_with(self.settings().clone(), options)
    }

    pub fn app_context_with(
        &self,
        settings: SettingsSnapshot,
        options: ContextOptions,
    ) -> Result<AppContext> {
        Ok(AppContext::new(settings, options)?)
    }
}
