//! Configuration module for Lookout clients
//!
//! A dashboard is configured with the URL it is served from. The socket URL is
//! derived from it so the connection always matches the page's security
//! context (`https` pages talk `wss`, `http` pages talk `ws`).

use lookout_core::{LookoutError, ReconnectConfig};
use lookout_websocket::WebSocketConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable names read by [`LookoutConfig::from_env`]
pub mod env {
    pub const APP_URL: &str = "LOOKOUT_APP_URL";
    pub const WS_PATH: &str = "LOOKOUT_WS_PATH";
    pub const RECONNECT_BASE_MS: &str = "LOOKOUT_RECONNECT_BASE_MS";
    pub const RECONNECT_MAX_MS: &str = "LOOKOUT_RECONNECT_MAX_MS";
    pub const CONNECT_TIMEOUT_SECS: &str = "LOOKOUT_CONNECT_TIMEOUT_SECS";
    pub const PING_INTERVAL_SECS: &str = "LOOKOUT_PING_INTERVAL_SECS";
}

/// Lookout client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookoutConfig {
    /// URL the dashboard is served from (e.g., "https://ops.example.com")
    pub app_url: String,

    /// Path of the event socket on the application host
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Ping interval in seconds (0 = disabled)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,

    /// Extra handshake headers, e.g. a session cookie
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Reconnect backoff
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_ws_path() -> String {
    "/api/ws/user".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_ping_interval() -> u64 {
    30
}

impl LookoutConfig {
    /// Config for `app_url` with every other field at its default
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into(),
            ws_path: default_ws_path(),
            connect_timeout_seconds: default_connect_timeout(),
            ping_interval_seconds: default_ping_interval(),
            headers: Vec::new(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, LookoutError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `LOOKOUT_*` environment variables
    pub fn from_env() -> Result<Self, LookoutError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup using the `LOOKOUT_*` variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LookoutError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_url = lookup(env::APP_URL)
            .ok_or_else(|| LookoutError::ConfigError(format!("{} is not set", env::APP_URL)))?;

        let mut config = Self::new(app_url);

        if let Some(path) = lookup(env::WS_PATH) {
            config.ws_path = path;
        }
        if let Some(ms) = parse_number(&lookup, env::RECONNECT_BASE_MS)? {
            config.reconnect.base_delay_ms = ms;
        }
        if let Some(ms) = parse_number(&lookup, env::RECONNECT_MAX_MS)? {
            config.reconnect.max_delay_ms = ms;
        }
        if let Some(secs) = parse_number(&lookup, env::CONNECT_TIMEOUT_SECS)? {
            config.connect_timeout_seconds = secs;
        }
        if let Some(secs) = parse_number(&lookup, env::PING_INTERVAL_SECS)? {
            config.ping_interval_seconds = secs;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LookoutError> {
        self.websocket_url()?;
        self.reconnect.validate()
    }

    /// Socket URL derived from `app_url` and `ws_path`
    pub fn websocket_url(&self) -> Result<Url, LookoutError> {
        let mut url = Url::parse(&self.app_url).map_err(|e| {
            LookoutError::ConfigError(format!("Invalid app_url '{}': {}", self.app_url, e))
        })?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(LookoutError::ConfigError(format!(
                    "app_url must be http(s) or ws(s), got '{}'",
                    other
                )))
            }
        };

        url.set_scheme(scheme).map_err(|_| {
            LookoutError::ConfigError(format!("Cannot derive socket URL from '{}'", self.app_url))
        })?;
        url.set_path(&self.ws_path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(url)
    }

    /// Transport settings for [`lookout_websocket::WebSocketTransport`]
    pub fn websocket_config(&self) -> Result<WebSocketConfig, LookoutError> {
        Ok(WebSocketConfig {
            url: self.websocket_url()?.to_string(),
            connect_timeout_seconds: self.connect_timeout_seconds,
            ping_interval_seconds: self.ping_interval_seconds,
            headers: self.headers.clone(),
        })
    }
}

fn parse_number<F>(lookup: &F, key: &str) -> Result<Option<u64>, LookoutError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| LookoutError::ConfigError(format!("{} ('{}'): {}", key, raw, e)))
        })
        .transpose()
}
