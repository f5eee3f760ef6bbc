//! Application configuration management.
//!
//! Two sources feed the client:
//! - `Config`: user preferences stored at `~/.config/smartcontact/config.json`
//! - `ApiSettings`: the API base URL, resolved from the environment
//!
//! Base URL resolution is a fixed three-step contract: an explicit
//! `SMARTCONTACT_API_URL` wins, otherwise development builds talk to the dev
//! proxy path `/api`, otherwise the production fallback host is used.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "smartcontact";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Explicit base URL override
pub const API_URL_ENV: &str = "SMARTCONTACT_API_URL";

/// Build mode override (`development` or `production`)
pub const MODE_ENV: &str = "SMARTCONTACT_MODE";

/// Origin the dev proxy path is served from
pub const DEV_ORIGIN_ENV: &str = "SMARTCONTACT_DEV_ORIGIN";

/// Proxy path used in development
pub const DEV_PROXY_PATH: &str = "/api";

/// Fallback base URL when nothing else applies
pub const FALLBACK_API_URL: &str = "http://localhost:3000/api/v1";

/// Default dev server origin for the proxy path
pub const DEFAULT_DEV_ORIGIN: &str = "http://localhost:8080";

/// Where the session pair is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub last_email: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default location of the config file
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the persisted session and the log file
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

/// Build mode, mirroring the dev/prod split of the web client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    /// Mode from `SMARTCONTACT_MODE`, else from the compile profile.
    pub fn from_env() -> Self {
        std::env::var(MODE_ENV)
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or_else(Self::compiled)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(BuildMode::Development),
            "production" | "prod" => Some(BuildMode::Production),
            _ => None,
        }
    }

    fn compiled() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }
}

/// Resolve the API base URL.
///
/// An empty override counts as unset.
pub fn resolve_base_url(explicit: Option<&str>, mode: BuildMode) -> String {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    match mode {
        BuildMode::Development => DEV_PROXY_PATH.to_string(),
        BuildMode::Production => FALLBACK_API_URL.to_string(),
    }
}

/// Resolved settings for the API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Base URL as resolved by the three-step contract (may be relative)
    pub base_url: String,
    /// Origin a relative base URL is served from
    pub dev_origin: String,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            dev_origin: DEFAULT_DEV_ORIGIN.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let explicit = std::env::var(API_URL_ENV).ok();
        let base_url = resolve_base_url(explicit.as_deref(), BuildMode::from_env());
        let dev_origin = std::env::var(DEV_ORIGIN_ENV)
            .ok()
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEV_ORIGIN.to_string());
        Self { base_url, dev_origin }
    }

    /// Absolute URL requests are sent to.
    ///
    /// A relative base (the dev proxy path) is joined onto the dev origin.
    pub fn effective_base_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.starts_with('/') {
            format!("{}{}", self.dev_origin.trim_end_matches('/'), base)
        } else {
            base.to_string()
        }
    }
}
