//! TOML-based configuration.
//!
//! Supports a config file (atlas.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [gateway]
//! tenant_id = "${PLATFORM_TENANT_ID}"
//! client_id = "${PLATFORM_CLIENT_ID}"
//! client_secret = "${PLATFORM_CLIENT_SECRET}"
//! timeout_secs = 30
//!
//! [store]
//! path = "./data/catalog.db"
//!
//! [context]
//! max_context_length = 10000
//! max_measures = 20
//!
//! [journal]
//! default_window_days = 30
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// External platform gateway credentials and endpoints.
    pub gateway: GatewaySettings,

    /// Catalog store location.
    pub store: StoreSettings,

    /// Context assembly limits.
    pub context: ContextSettings,

    /// Query journal defaults.
    pub journal: JournalSettings,
}

/// Gateway configuration.
///
/// Credential fields support `${ENV_VAR}` expansion so secrets stay out of
/// the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,

    /// Platform API base URL.
    pub base_url: String,

    /// Identity provider authority URL.
    pub authority: String,

    /// OAuth scope requested with the client-credential grant.
    pub scope: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            base_url: "https://api.powerbi.com/v1.0/myorg".to_string(),
            authority: "https://login.microsoftonline.com".to_string(),
            scope: "https://analysis.windows.net/powerbi/api/.default".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GatewaySettings {
    /// Whether all credential fields are present.
    pub fn is_configured(&self) -> bool {
        !self.tenant_id.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Token endpoint for the configured tenant.
    pub fn token_url(&self) -> Result<String, SettingsError> {
        let tenant = expand_env_vars(&self.tenant_id)?;
        Ok(format!("{}/{}/oauth2/v2.0/token", self.authority, tenant))
    }

    pub fn resolved_client_id(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.client_id)
    }

    pub fn resolved_client_secret(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.client_secret)
    }
}

/// Store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Database path. When unset, `~/.atlas/catalog.db` is used.
    pub path: Option<String>,
}

impl StoreSettings {
    /// The configured path with environment variables expanded, if any.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        match &self.path {
            Some(p) => Ok(Some(PathBuf::from(expand_env_vars(p)?))),
            None => Ok(None),
        }
    }
}

/// Context assembly limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Character budget for a serialized context bundle.
    pub max_context_length: usize,

    /// Top-N cap on scored measures.
    pub max_measures: usize,

    /// Top-N cap on scored tables.
    pub max_tables: usize,

    /// Cap on similar prior queries included in a bundle.
    pub max_history: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_context_length: 10_000,
            max_measures: 20,
            max_tables: 20,
            max_history: 5,
        }
    }
}

/// Query journal defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JournalSettings {
    /// Analytics window when the caller does not specify one.
    pub default_window_days: u32,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            default_window_days: 30,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `ATLAS_CONFIG`
    /// 2. `./atlas.toml`
    /// 3. `~/.config/atlas/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("ATLAS_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("atlas.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("atlas").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(ch);
                    chars.next();
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                // $VAR (ends at non-alphanumeric/underscore)
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    // Just a lone $, keep it
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
