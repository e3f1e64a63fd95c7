//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the lookout-core crate.
//!
//! # Examples
//!
//! ```
//! use lookout_core::prelude::*;
//!
//! // Now you have access to all commonly used types:
//! // - LookoutClient, SubscriptionHandle, ConnectionState
//! // - IncomingFrame, OutgoingFrame
//! // - Transport, TransportLink, TransportEvent
//! // - LookoutError, ReconnectConfig
//! ```

pub use crate::client::{ConnectionState, LookoutClient, SubscriptionHandle};
pub use crate::config::ReconnectConfig;
pub use crate::errors::LookoutError;
pub use crate::events;
pub use crate::frame::{FrameKind, IncomingFrame, OutgoingFrame};
pub use crate::registry::{ChannelCallback, ListenerId};
pub use crate::transport::{Transport, TransportEvent, TransportInfo, TransportLink};
