//! Reference-counted channel registry
//!
//! Maps channel names to their listeners. Listeners live in an arena keyed by
//! [`ListenerId`], so removal never depends on comparing callbacks. The
//! registry performs no I/O: it reports when a channel gains its first
//! listener or loses its last one, and the connection manager turns that into
//! subscribe/unsubscribe frames.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::errors::LookoutError;
use crate::frame::IncomingFrame;

/// Callback invoked with every frame delivered on a channel
pub type ChannelCallback =
    Arc<dyn Fn(&IncomingFrame) -> Result<(), LookoutError> + Send + Sync>;

/// Opaque listener identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Result of adding a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub id: ListenerId,
    /// The channel had no listeners before this one
    pub first_listener: bool,
}

/// Result of removing a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub channel: String,
    /// The channel has no listeners left and was dropped
    pub last_listener: bool,
}

struct Listener {
    channel: String,
    callback: ChannelCallback,
}

#[derive(Default)]
pub struct ChannelRegistry {
    next_id: u64,
    listeners: HashMap<ListenerId, Listener>,
    channels: BTreeMap<String, Vec<ListenerId>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: &str, callback: ChannelCallback) -> Registration {
        self.next_id += 1;
        let id = ListenerId(self.next_id);

        let ids = self.channels.entry(channel.to_string()).or_default();
        let first_listener = ids.is_empty();
        ids.push(id);

        self.listeners.insert(
            id,
            Listener {
                channel: channel.to_string(),
                callback,
            },
        );

        Registration { id, first_listener }
    }

    /// Remove a listener; unknown ids are ignored
    pub fn remove(&mut self, id: ListenerId) -> Option<Removal> {
        let listener = self.listeners.remove(&id)?;

        let last_listener = match self.channels.get_mut(&listener.channel) {
            Some(ids) => {
                ids.retain(|existing| *existing != id);
                ids.is_empty()
            }
            None => true,
        };

        if last_listener {
            self.channels.remove(&listener.channel);
        }

        Some(Removal {
            channel: listener.channel,
            last_listener,
        })
    }

    /// Snapshot of a channel's listeners in registration order
    pub fn listeners(&self, channel: &str) -> Vec<(ListenerId, ChannelCallback)> {
        self.channels
            .get(channel)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| {
                        self.listeners
                            .get(id)
                            .map(|listener| (*id, listener.callback.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    /// Channels with at least one listener, sorted by name
    pub fn active_channels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn is_active(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
