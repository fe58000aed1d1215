//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base URL, the public endpoint allowlist, the auth endpoint paths and the
//! session expiry timings.
//!
//! Configuration is stored at `~/.config/bullion-desk/config.json` and can be
//! overridden from the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "bullion-desk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/v1";

/// How long the "session expired" warning stays visible before the restart.
const DEFAULT_WARNING_DURATION_MS: u64 = 2000;

const ENV_API_URL: &str = "BULLION_API_URL";
const ENV_TOKEN_BACKEND: &str = "BULLION_TOKEN_BACKEND";
const ENV_REQUEST_TIMEOUT: &str = "BULLION_REQUEST_TIMEOUT_SECS";

/// Where the access token is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(TokenBackend::File),
            "keyring" => Ok(TokenBackend::Keyring),
            "memory" => Ok(TokenBackend::Memory),
            other => Err(format!("unknown token backend '{}'", other)),
        }
    }
}

impl TokenBackend {
    pub fn display_name(&self) -> &'static str {
        match self {
            TokenBackend::File => "file",
            TokenBackend::Keyring => "keyring",
            TokenBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Paths containing any of these never carry a bearer token.
    pub public_paths: Vec<String>,
    pub refresh_path: String,
    pub login_path: String,
    pub register_path: String,
    pub logout_path: String,
    pub warning_duration_ms: u64,
    /// Route the application restarts at once the session is over.
    pub entry_route: String,
    pub request_timeout_secs: Option<u64>,
    pub token_backend: TokenBackend,
    pub coalesce_refresh: bool,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            public_paths: vec!["/login".to_string(), "/register".to_string()],
            refresh_path: "/refresh".to_string(),
            login_path: "/login".to_string(),
            register_path: "/register".to_string(),
            logout_path: "/logout".to_string(),
            warning_duration_ms: DEFAULT_WARNING_DURATION_MS,
            entry_route: "/".to_string(),
            request_timeout_secs: None,
            token_backend: TokenBackend::default(),
            coalesce_refresh: true,
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent) and apply env overrides.
    ///
    /// The result is a runtime view; persist changes with
    /// `remember_username` rather than saving it back.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read the config file only, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Record the last signed-in user in the config file, leaving every
    /// other stored setting as it is on disk.
    pub fn remember_username(username: &str) -> Result<()> {
        Self::remember_username_at(&Self::config_path()?, username)
    }

    fn remember_username_at(path: &Path, username: &str) -> Result<()> {
        let mut stored = Self::load_from(path)?;
        stored.last_username = Some(username.to_string());
        stored.save_to(path)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TOKEN_BACKEND) {
            match raw.parse::<TokenBackend>() {
                Ok(backend) => self.token_backend = backend,
                Err(e) => warn!(error = %e, "Ignoring token backend override"),
            }
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = Some(secs),
                _ => warn!(value = %raw, "Invalid request timeout, ignoring"),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn warning_duration(&self) -> Duration {
        Duration::from_millis(self.warning_duration_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.contains(p.as_str()))
    }
}
