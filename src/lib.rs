//! # Lookout
//!
//! Real-time channel multiplexing client for operations dashboards.
//!
//! ## Features
//!
//! - **One connection**: every channel shares a single WebSocket
//! - **Shared channels**: many listeners per channel, one subscribe frame on the wire
//! - **Transparent reconnect**: capped exponential backoff and subscription replay
//! - **Offline intent**: frames sent while disconnected are queued and flushed on open
//!
//! ## Quick Start
//!
//! An `https` application URL maps to a `wss` socket, which needs the `tls`
//! feature. Without it [`websocket_client`] returns a configuration error.
//!
//! ```rust,no_run
//! use lookout::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LookoutError> {
//!     let config = LookoutConfig::new("https://ops.example.com");
//!     let client = lookout::websocket_client(&config)?;
//!
//!     let handle = client.subscribe("server_status", |frame| {
//!         if frame.event == events::SERVER_STATUS_CHANGED {
//!             println!("{}", frame.payload);
//!         }
//!         Ok(())
//!     });
//!
//!     client.connect().await?;
//!
//!     // ...
//!
//!     handle.unsubscribe();
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod prelude;

// Re-export all public types from submodules
pub use lookout_config::LookoutConfig;

pub use lookout_core::{
    events, ChannelCallback, ConnectionState, FrameKind, IncomingFrame, ListenerId, LookoutClient,
    LookoutError, OutgoingFrame, ReconnectConfig, SubscriptionHandle, Transport, TransportEvent,
    TransportInfo, TransportLink,
};

pub use lookout_websocket::{WebSocketConfig, WebSocketTransport};

/// Build a client that talks to the socket described by `config`.
///
/// Must be called inside a tokio runtime. No connection is opened until the
/// first `subscribe` or `connect`.
pub fn websocket_client(config: &LookoutConfig) -> Result<LookoutClient, LookoutError> {
    config.validate()?;
    let transport = WebSocketTransport::new(config.websocket_config()?)?;
    LookoutClient::new(Arc::new(transport), config.reconnect.clone())
}
