//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/wilmes/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/wilmes/` (~/.config/wilmes/)
//! - State/Logs: `$XDG_STATE_HOME/wilmes/` (~/.local/state/wilmes/)
//!
//! The password is never read from here; front ends take it from the
//! environment or a prompt.

use crate::error::{Error, Result};
use crate::extract::MarkupVariant;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Which portal to talk to and how to read it
    #[serde(default)]
    pub portal: PortalConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Portal instance settings
#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    /// Base URL, e.g. `https://school.example.com`
    pub url: Option<String>,

    /// Login name
    pub username: Option<String>,

    /// Markup generation of the portal software
    #[serde(default)]
    pub variant: MarkupVariant,

    /// IANA zone for timestamps the portal prints without an offset
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            variant: MarkupVariant::default(),
            timezone: default_timezone(),
        }
    }
}

impl PortalConfig {
    /// The configured zone.
    pub fn zone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| Error::Config(format!("invalid portal.timezone {:?}: {}", self.timezone, e)))
    }
}

fn default_timezone() -> String {
    "Europe/Helsinki".to_string()
}

/// HTTP client settings
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("wilmes/{}", env!("CARGO_PKG_VERSION"))
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.portal.url {
            let parsed = url::Url::parse(url)
                .map_err(|e| Error::Config(format!("invalid portal.url {:?}: {}", url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "portal.url must be http or https, got {:?}",
                    url
                )));
            }
        }
        self.portal.zone()?;
        if self.http.timeout_secs == 0 {
            return Err(Error::Config(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/wilmes/config.toml` (~/.config/wilmes/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("wilmes").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/wilmes/` (~/.local/state/wilmes/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("wilmes")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/wilmes/wilmes.log` (~/.local/state/wilmes/wilmes.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("wilmes.log")
    }
}
