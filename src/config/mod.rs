//! Configuration for Plugsmith
//!
//! Settings are read from a JSON file (an explicit path, or
//! `~/.plugsmith/config.json` when present) and then overridden by
//! environment variables. Every field has a default so an empty or missing
//! file is valid.
//!
//! # Example config.json
//!
//! ```json
//! {
//!   "engine": { "url": "https://engine.internal:8080", "token": "secret" },
//!   "install": { "strict": true }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlugsmithError, Result};

/// Environment variable overriding [`EngineConfig::url`].
pub const ENV_ENGINE_URL: &str = "PLUGSMITH_ENGINE_URL";
/// Environment variable overriding [`EngineConfig::token`].
pub const ENV_ENGINE_TOKEN: &str = "PLUGSMITH_ENGINE_TOKEN";
/// Environment variable overriding [`InstallConfig::strict`].
pub const ENV_STRICT: &str = "PLUGSMITH_STRICT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub install: InstallConfig,
}

/// Connection settings for the data engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the engine API.
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            token: None,
            timeout_secs: None,
        }
    }
}

/// Installer behaviour and the reserved collection names it relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Fail on any placeholder that no variable resolves.
    #[serde(default)]
    pub strict: bool,

    /// Target whose records (entity definitions) install before all others.
    #[serde(default = "default_base_entities_target")]
    pub base_entities_target: String,

    /// Collection receiving the plugin metadata record.
    #[serde(default = "default_plugins_target")]
    pub plugins_target: String,

    /// Field set to the plugin id on records of plugin-scoped entities.
    #[serde(default = "default_plugin_ref_field")]
    pub plugin_ref_field: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            strict: false,
            base_entities_target: default_base_entities_target(),
            plugins_target: default_plugins_target(),
            plugin_ref_field: default_plugin_ref_field(),
        }
    }
}

fn default_engine_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_base_entities_target() -> String {
    "entities".to_string()
}

fn default_plugins_target() -> String {
    "plugins".to_string()
}

fn default_plugin_ref_field() -> String {
    "plugin_id".to_string()
}

impl Config {
    /// Default config file location (`~/.plugsmith/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".plugsmith").join("config.json"))
    }

    /// Load configuration from `path`, or from [`Config::default_path`] if it
    /// exists, then apply environment overrides.
    ///
    /// An explicit `path` that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(default) => Self::from_file(&default)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse a config file without applying environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlugsmithError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        serde_json::from_str(&content)
            .map_err(|e| PlugsmithError::Config(format!("Invalid {}: {}", path.display(), e)))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ENGINE_URL).filter(|v| !v.trim().is_empty()) {
            self.engine.url = url;
        }
        if let Some(token) = lookup(ENV_ENGINE_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.engine.token = Some(token);
        }
        if let Some(strict) = lookup(ENV_STRICT) {
            self.install.strict = parse_bool(&strict).ok_or_else(|| {
                PlugsmithError::Config(format!("{} must be true or false, got '{}'", ENV_STRICT, strict))
            })?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
