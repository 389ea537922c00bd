//! # vigil-config
//!
//! Console configuration for Vigil.
//!
//! Settings live in `~/.vigil/config.yaml`. Every field is optional; a
//! missing file means "all defaults". The `VIGIL_API_URL` environment variable
//! and command-line flags override what the file says.
//!
//! ```yaml
//! api_url: http://ids-gateway.internal:8080
//! stream_port: 8000
//! reconnect_delay_secs: 5
//! theme: light
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vigil_core::logging::vigil_home;
use vigil_core::{Result, VigilError};

/// Environment variable overriding [`ConsoleConfig::api_url`].
pub const API_URL_ENV: &str = "VIGIL_API_URL";

/// Port the alert stream listens on, separate from the dashboard API.
pub const DEFAULT_STREAM_PORT: u16 = 8000;

/// Path of the alert stream endpoint.
pub const DEFAULT_STREAM_PATH: &str = "/ws/alerts";

/// Color scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemePreference {
    #[default]
    Dark,
    Light,
}

/// Console configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the dashboard API (REST endpoints and login)
    pub api_url: String,

    /// Port of the WebSocket alert stream on the same host
    pub stream_port: u16,

    /// Path of the WebSocket alert stream
    pub stream_path: String,

    /// Fixed delay before reconnecting a dropped stream
    pub reconnect_delay_secs: u64,

    /// Interval of the periodic stats refresh
    pub stats_refresh_secs: u64,

    /// How long a notification stays on screen
    pub toast_secs: u64,

    /// Timeout for each REST request
    pub request_timeout_secs: u64,

    /// Alert count used on the first visit to the alert list
    pub default_alert_count: u32,

    /// Where downloaded reports are written
    pub download_dir: PathBuf,

    /// Color scheme used until the operator toggles it
    pub theme: ThemePreference,

    /// Show the login screen before the dashboard
    pub require_login: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let home = vigil_home().unwrap_or_else(|_| PathBuf::from(".vigil"));
        Self {
            api_url: "http://localhost:8080".to_string(),
            stream_port: DEFAULT_STREAM_PORT,
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            reconnect_delay_secs: 5,
            stats_refresh_secs: 5,
            toast_secs: 3,
            request_timeout_secs: 5,
            default_alert_count: 50,
            download_dir: home.join("reports"),
            theme: ThemePreference::default(),
            require_login: false,
        }
    }
}

impl ConsoleConfig {
    /// Default config file location, `~/.vigil/config.yaml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(vigil_home()?.join("config.yaml"))
    }

    /// Load configuration from `path` (or the default location), then apply
    /// the environment override and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = Self::from_file(&path)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            debug!(url = %url, "api_url overridden from environment");
            config.api_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(VigilError::config_not_found_with_source(path, e)),
        };
        Self::from_yaml(&content, path)
    }

    /// Parse YAML content. `path` is only used for error messages.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| {
            let message = match e.location() {
                Some(loc) => format!("{} (line {}, column {})", e, loc.line(), loc.column()),
                None => e.to_string(),
            };
            VigilError::config_invalid(path, message)
        })
    }

    /// Check values that would otherwise fail later in confusing ways.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base()?;
        if url.host_str().is_none() {
            return Err(VigilError::config_validation(format!(
                "api_url has no host: {}",
                self.api_url
            )));
        }
        if self.stream_port == 0 {
            return Err(VigilError::config_validation("stream_port must be non-zero"));
        }
        if !self.stream_path.starts_with('/') {
            return Err(VigilError::config_validation(format!(
                "stream_path must start with '/': {}",
                self.stream_path
            )));
        }
        for (name, value) in [
            ("reconnect_delay_secs", self.reconnect_delay_secs),
            ("stats_refresh_secs", self.stats_refresh_secs),
            ("toast_secs", self.toast_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(VigilError::config_validation(format!("{name} must be at least 1")));
            }
        }
        if self.default_alert_count == 0 {
            return Err(VigilError::config_validation("default_alert_count must be at least 1"));
        }
        Ok(())
    }

    /// Parsed REST base URL. Only `http` and `https` are accepted.
    pub fn api_base(&self) -> Result<Url> {
        let url = Url::parse(&self.api_url).map_err(|e| {
            let message = format!("api_url is not a valid URL ({e}): {}", self.api_url);
            VigilError::config_validation(message)
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(VigilError::config_validation(format!(
                "api_url must use http or https, not {other}"
            ))),
        }
    }

    /// Alert stream URL derived from the API host.
    ///
    /// `https` APIs get a `wss` stream, everything else `ws`. The port is
    /// always [`ConsoleConfig::stream_port`], regardless of the API port.
    pub fn stream_url(&self) -> Result<String> {
        let api = self.api_base()?;
        let host = api.host_str().ok_or_else(|| {
            VigilError::config_validation(format!("api_url has no host: {}", self.api_url))
        })?;
        let scheme = if api.scheme() == "https" { "wss" } else { "ws" };
        // host_str keeps the brackets around IPv6 literals.
        Ok(format!("{scheme}://{host}:{}{}", self.stream_port, self.stream_path))
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Stats refresh interval as a [`Duration`].
    pub fn stats_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stats_refresh_secs)
    }

    /// Notification lifetime as a [`Duration`].
    pub fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.toast_secs)
    }

    /// REST request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
