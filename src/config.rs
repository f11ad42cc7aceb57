//! Client configuration.
//!
//! Settings come from the environment (see [`ClientConfig::from_env`]) and
//! can be adjusted with the `with_*` builders afterwards.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::monitor::{MonitorConfig, DEFAULT_BUFFER_TIME, DEFAULT_CHECK_INTERVAL};

pub const ENV_API_URL: &str = "TETHER_API_URL";
pub const ENV_WS_URL: &str = "TETHER_WS_URL";
pub const ENV_MAPS_API_KEY: &str = "TETHER_MAPS_API_KEY";
pub const ENV_REFRESH_BUFFER_SECS: &str = "TETHER_REFRESH_BUFFER_SECS";
pub const ENV_CHECK_INTERVAL_SECS: &str = "TETHER_CHECK_INTERVAL_SECS";
pub const ENV_STORE_PATH: &str = "TETHER_STORE_PATH";

/// Path of the SSE endpoint, relative to the API base URL.
pub const SSE_PATH: &str = "/notifications/stream";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidDuration { var: &'static str, value: String },

    #[error("Could not determine a location for the secure store")]
    NoStorePath,
}

/// Where and how the client talks to the backend.
///
/// # Example
///
/// ```ignore
/// use tether::config::ClientConfig;
///
/// let config = ClientConfig::from_env()?
///     .with_check_interval(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// REST base URL, without a trailing slash
    pub api_url: String,
    /// WebSocket URL for notifications; SSE under the API is used when unset
    pub ws_url: Option<String>,
    /// Mapping-service key, passed through untouched
    pub maps_api_key: Option<String>,
    pub refresh_buffer: Duration,
    pub check_interval: Duration,
    pub store_path: PathBuf,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API URL.
    pub fn new(api_url: impl Into<String>) -> Result<Self, ConfigError> {
        let store_path = crate::adapters::FileSecureStore::default_path()
            .ok_or(ConfigError::NoStorePath)?;
        Ok(Self {
            api_url: normalize_url(ENV_API_URL, &api_url.into(), &["http://", "https://"])?,
            ws_url: None,
            maps_api_key: None,
            refresh_buffer: DEFAULT_BUFFER_TIME,
            check_interval: DEFAULT_CHECK_INTERVAL,
            store_path,
        })
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get(ENV_API_URL).ok_or(ConfigError::Missing(ENV_API_URL))?;
        let mut config = Self::new(api_url)?;

        if let Some(ws_url) = get(ENV_WS_URL) {
            config.ws_url = Some(normalize_url(ENV_WS_URL, &ws_url, &["ws://", "wss://"])?);
        }
        config.maps_api_key = get(ENV_MAPS_API_KEY);
        if let Some(raw) = get(ENV_REFRESH_BUFFER_SECS) {
            config.refresh_buffer = parse_secs(ENV_REFRESH_BUFFER_SECS, &raw)?;
        }
        if let Some(raw) = get(ENV_CHECK_INTERVAL_SECS) {
            config.check_interval = parse_secs(ENV_CHECK_INTERVAL_SECS, &raw)?;
        }
        if let Some(path) = get(ENV_STORE_PATH) {
            config.store_path = PathBuf::from(path);
        }

        Ok(config)
    }

    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    pub fn with_maps_api_key(mut self, key: impl Into<String>) -> Self {
        self.maps_api_key = Some(key.into());
        self
    }

    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// SSE endpoint used when no WebSocket URL is configured.
    pub fn sse_url(&self) -> String {
        format!("{}{}", self.api_url, SSE_PATH)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig::new(self.refresh_buffer, self.check_interval)
    }
}

fn normalize_url(
    var: &'static str,
    value: &str,
    schemes: &[&str],
) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let has_host = schemes
        .iter()
        .find_map(|scheme| trimmed.strip_prefix(scheme))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(ConfigError::InvalidUrl {
            var,
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_secs(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidDuration {
            var,
            value: raw.to_string(),
        }),
    }
}
