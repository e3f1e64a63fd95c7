//! Core types for the Lookout real-time dashboard client
//!
//! One persistent connection per client, many named channels multiplexed over
//! it. See [`LookoutClient`] for the connection lifecycle.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod backoff;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod frame;
pub mod prelude;
pub mod queue;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::{Backoff, ReconnectScheduler, ScheduledRetry};
pub use client::{ConnectionState, LookoutClient, SubscriptionHandle};
pub use config::ReconnectConfig;
pub use errors::LookoutError;
pub use frame::{FrameKind, IncomingFrame, OutgoingFrame};
pub use queue::OutboundQueue;
pub use registry::{ChannelCallback, ChannelRegistry, ListenerId};
pub use transport::{Transport, TransportEvent, TransportInfo, TransportLink};
