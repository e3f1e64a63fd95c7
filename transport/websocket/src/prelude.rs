//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types from the lookout-websocket crate.
//!
//! # Examples
//!
//! ```
//! use lookout_websocket::prelude::*;
//!
//! // Now you have access to:
//! // - WebSocketConfig
//! // - WebSocketTransport
//! ```

pub use crate::config::WebSocketConfig;
pub use crate::transport::WebSocketTransport;
