//! WebSocket configuration

use serde::{Deserialize, Serialize};

/// WebSocket connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// WebSocket server URL (e.g., "wss://ops.example.com/api/ws/user")
    pub url: String,

    /// Handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Ping interval in seconds (0 = disabled)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,

    /// Custom headers for WebSocket handshake
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_ping_interval() -> u64 {
    30
}

impl WebSocketConfig {
    /// Config for `url` with every other field at its default
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3000/api/ws/user".to_string(),
            connect_timeout_seconds: default_connect_timeout(),
            ping_interval_seconds: default_ping_interval(),
            headers: Vec::new(),
        }
    }
}
