pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;
pub mod overrides;

pub use defaults::{default_snapshot, DEFAULT_DEGRADED_ACCOUNT_ID};
pub use errors::SettingsError;
pub use loader::{load_settings, load_settings_with_options, LoadOptions};
pub use model::{
    AssignmentStrategy, ConnectionSettings, IdentitySettings, ProviderSettings, SettingSource,
    SettingsSnapshot,
};
pub use overrides::{apply_setting, SUPPORTED_PATHS};
