//! Prelude module for convenient imports

pub use lookout_config::LookoutConfig;

pub use lookout_core::{
    events, ChannelCallback, ConnectionState, IncomingFrame, ListenerId, LookoutClient,
    LookoutError, OutgoingFrame, ReconnectConfig, SubscriptionHandle, Transport, TransportInfo,
};

pub use lookout_websocket::{WebSocketConfig, WebSocketTransport};
