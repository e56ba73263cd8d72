//! Configuration module.
//!
//! Handles the `atlas.toml` settings file, environment variable expansion,
//! and per-component settings defaults.

mod settings;

pub use settings::{
    expand_env_vars, ContextSettings, GatewaySettings, JournalSettings, Settings, SettingsError,
    StoreSettings,
};
