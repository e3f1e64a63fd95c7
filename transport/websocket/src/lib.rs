//! WebSocket transport for Lookout
//!
//! Implements the [`lookout_core::Transport`] seam on top of tokio-tungstenite:
//! - Handshake timeout and custom handshake headers
//! - Ping keepalive
//! - `wss://` support behind the `tls` feature; without it `wss` URLs are
//!   rejected by [`WebSocketTransport::new`]

mod config;
pub mod prelude;
mod transport;

pub use config::WebSocketConfig;
pub use transport::WebSocketTransport;
