//! Connection manager for the single multiplexed link
//!
//! [`LookoutClient`] owns the transport link and its lifecycle, the outbound
//! queue, the channel registry and the reconnect scheduler. All of that state
//! sits behind one mutex, so every transition (open, close, timer fire,
//! subscribe, unsubscribe) is applied in a single total order. Listener
//! callbacks always run outside the lock and may call back into the client.

use std::collections::HashSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backoff::ReconnectScheduler;
use crate::config::ReconnectConfig;
use crate::errors::LookoutError;
use crate::frame::{FrameKind, IncomingFrame, OutgoingFrame};
use crate::queue::OutboundQueue;
use crate::registry::{ChannelCallback, ChannelRegistry, ListenerId};
use crate::transport::{Transport, TransportEvent, TransportInfo, TransportLink};

/// Lifecycle state of the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

type Waiter = oneshot::Sender<Result<(), LookoutError>>;

struct ClientState {
    phase: ConnectionState,
    /// Bumped for every new attempt and on disconnect; stale attempts and
    /// sessions compare against it and back off.
    generation: u64,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    session: Option<JoinHandle<()>>,
    explicit_close: bool,
    waiters: Vec<Waiter>,
    queue: OutboundQueue,
    registry: ChannelRegistry,
    scheduler: ReconnectScheduler,
}

impl ClientState {
    /// Write now if open, otherwise queue for the next open
    fn send(&mut self, frame: OutgoingFrame) {
        if self.phase == ConnectionState::Open {
            self.transmit(&frame);
        } else {
            crate::debug_log!(
                channel = %frame.channel(),
                kind = ?frame.kind(),
                queued = self.queue.len() + 1,
                "Connection not open, queueing frame"
            );
            self.queue.enqueue(frame);
        }
    }

    fn transmit(&self, frame: &OutgoingFrame) -> bool {
        let Some(outgoing) = self.outgoing.as_ref() else {
            return false;
        };

        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                error!(channel = %frame.channel(), error = %e, "Failed to encode frame");
                return false;
            }
        };

        if outgoing.send(text).is_err() {
            // The link is going down; replay on the next open covers this frame.
            warn!(
                channel = %frame.channel(),
                kind = ?frame.kind(),
                "Link closed while sending frame, dropping it"
            );
            return false;
        }

        crate::debug_log!(channel = %frame.channel(), kind = ?frame.kind(), "Frame sent");
        true
    }

    fn resolve_waiters(&mut self, outcome: impl Fn() -> Result<(), LookoutError>) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome());
        }
    }
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    runtime: Handle,
    state: Mutex<ClientState>,
    connected: watch::Sender<bool>,
}

impl ClientInner {
    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_attempt(self: &Arc<Self>, state: &mut ClientState) {
        state.generation += 1;
        state.phase = ConnectionState::Connecting;
        let generation = state.generation;

        info!(
            generation,
            endpoint = %self.transport.info().endpoint,
            "Opening connection"
        );

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = inner.transport.open().await;
            inner.finish_attempt(generation, result);
        });
    }

    fn finish_attempt(self: &Arc<Self>, generation: u64, result: Result<TransportLink, LookoutError>) {
        let mut state = self.lock();

        if state.generation != generation || state.phase != ConnectionState::Connecting {
            // Superseded by disconnect; dropping the link closes it.
            crate::debug_log!(generation, "Discarding superseded connection attempt");
            return;
        }

        match result {
            Ok(link) => self.on_open(&mut state, generation, link),
            Err(e) => {
                warn!(generation, error = %e, "Connection attempt failed");
                state.phase = ConnectionState::Closed;
                let reason = e.to_string();
                state.resolve_waiters(|| Err(LookoutError::ConnectionError(reason.clone())));
                self.schedule_retry(&mut state);
            }
        }
    }

    fn on_open(self: &Arc<Self>, state: &mut ClientState, generation: u64, link: TransportLink) {
        let TransportLink { outgoing, incoming } = link;

        state.phase = ConnectionState::Open;
        state.outgoing = Some(outgoing);
        state.scheduler.cancel();
        state.scheduler.reset();
        self.connected.send_replace(true);

        // Queued intent goes out first, in order. Replay then declares every
        // active channel the flush did not already cover.
        let flushed = state.queue.drain();
        let flushed_count = flushed.len();
        let mut declared = HashSet::new();
        for frame in flushed {
            match frame.kind() {
                FrameKind::Subscribe => {
                    declared.insert(frame.channel().to_string());
                }
                FrameKind::Unsubscribe => {
                    declared.remove(frame.channel());
                }
            }
            state.transmit(&frame);
        }

        let replay: Vec<String> = state
            .registry
            .active_channels()
            .into_iter()
            .filter(|channel| !declared.contains(channel))
            .collect();
        for channel in &replay {
            state.transmit(&OutgoingFrame::subscribe(channel.as_str()));
        }

        info!(
            generation,
            flushed = flushed_count,
            resubscribed = replay.len(),
            "Connection open"
        );

        state.resolve_waiters(|| Ok(()));

        let inner = Arc::clone(self);
        state.session = Some(self.runtime.spawn(async move {
            inner.run_session(generation, incoming).await;
        }));
    }

    async fn run_session(
        self: Arc<Self>,
        generation: u64,
        mut incoming: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        let mut reason = None;

        while let Some(event) = incoming.recv().await {
            match event {
                TransportEvent::Message(text) => {
                    if !self.dispatch(generation, &text) {
                        return;
                    }
                }
                TransportEvent::Error(e) => {
                    // Errors force the link closed and share the close path.
                    warn!(generation, error = %e, "Transport error, closing connection");
                    reason = Some(e);
                    break;
                }
                TransportEvent::Closed { reason: remote } => {
                    reason = remote;
                    break;
                }
            }
        }

        drop(incoming);
        self.handle_close(generation, reason);
    }

    /// Returns false once this session has been superseded
    fn dispatch(&self, generation: u64, text: &str) -> bool {
        let frame = match IncomingFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!(generation, error = %e, "Failed to decode incoming frame, dropping it");
                return true;
            }
        };

        let listeners = {
            let state = self.lock();
            if state.generation != generation {
                return false;
            }
            state.registry.listeners(&frame.channel)
        };

        if listeners.is_empty() {
            crate::debug_log!(
                channel = %frame.channel,
                event = %frame.event,
                "No listeners for channel, ignoring frame"
            );
            return true;
        }

        for (id, callback) in listeners {
            let still_registered = self.lock().registry.contains(id);
            if !still_registered {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| callback(&frame))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(
                        listener = %id,
                        channel = %frame.channel,
                        event = %frame.event,
                        error = %e,
                        "Channel callback failed"
                    );
                }
                Err(_) => {
                    error!(
                        listener = %id,
                        channel = %frame.channel,
                        event = %frame.event,
                        "Channel callback panicked"
                    );
                }
            }
        }

        true
    }

    fn handle_close(self: &Arc<Self>, generation: u64, reason: Option<String>) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }

        state.phase = ConnectionState::Closed;
        state.outgoing = None;
        state.session = None;
        self.connected.send_replace(false);

        info!(
            generation,
            reason = reason.as_deref().unwrap_or("none"),
            "Connection closed"
        );

        if !state.explicit_close {
            self.schedule_retry(&mut state);
        }
    }

    fn schedule_retry(self: &Arc<Self>, state: &mut ClientState) {
        let inner = Arc::downgrade(self);
        let scheduled = state.scheduler.schedule(&self.runtime, move |ticket| {
            if let Some(inner) = inner.upgrade() {
                inner.fire_retry(ticket);
            }
        });

        if let Some(retry) = scheduled {
            info!(
                attempt = retry.attempt,
                delay_ms = retry.delay.as_millis() as u64,
                "Reconnect scheduled"
            );
        }
    }

    fn fire_retry(self: &Arc<Self>, ticket: u64) {
        let mut state = self.lock();
        if !state.scheduler.take_fired(ticket) {
            return;
        }
        if state.explicit_close || state.phase != ConnectionState::Closed {
            return;
        }

        info!(attempt = state.scheduler.attempt(), "Reconnecting");
        self.begin_attempt(&mut state);
    }

    fn remove_listener(&self, id: ListenerId) {
        let mut state = self.lock();
        let Some(removal) = state.registry.remove(id) else {
            return;
        };

        if removal.last_listener {
            info!(channel = %removal.channel, "Unsubscribing from channel");
            state.send(OutgoingFrame::unsubscribe(removal.channel));
        }
    }
}

/// Client context: one per dashboard session.
///
/// Cloning is cheap and every clone drives the same connection, so the client
/// can be handed to each collaborator that needs live events.
#[derive(Clone)]
pub struct LookoutClient {
    inner: Arc<ClientInner>,
}

impl LookoutClient {
    /// Create a client on the current tokio runtime. No connection is opened
    /// until the first `subscribe` or `connect`.
    pub fn new(
        transport: Arc<dyn Transport>,
        reconnect: ReconnectConfig,
    ) -> Result<Self, LookoutError> {
        reconnect.validate()?;

        let runtime = Handle::try_current().map_err(|e| {
            LookoutError::ConfigError(format!(
                "LookoutClient must be created inside a tokio runtime: {}",
                e
            ))
        })?;

        let (connected, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(ClientInner {
                transport,
                runtime,
                state: Mutex::new(ClientState {
                    phase: ConnectionState::Closed,
                    generation: 0,
                    outgoing: None,
                    session: None,
                    explicit_close: false,
                    waiters: Vec::new(),
                    queue: OutboundQueue::new(),
                    registry: ChannelRegistry::new(),
                    scheduler: ReconnectScheduler::new(&reconnect),
                }),
                connected,
            }),
        })
    }

    /// Open the connection.
    ///
    /// Returns immediately when already open and joins the in-flight attempt
    /// when connecting. A failed attempt is reported here and retried in the
    /// background.
    pub async fn connect(&self) -> Result<(), LookoutError> {
        let waiter = {
            let mut state = self.inner.lock();
            match state.phase {
                ConnectionState::Open => return Ok(()),
                ConnectionState::Connecting => {}
                ConnectionState::Closed => {
                    state.explicit_close = false;
                    state.scheduler.cancel();
                    self.inner.begin_attempt(&mut state);
                }
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            rx
        };

        waiter.await.map_err(|_| {
            LookoutError::InternalError("connection attempt was dropped".to_string())
        })?
    }

    /// Close the connection and stop reconnecting until the next
    /// `connect` or `subscribe`.
    pub fn disconnect(&self) {
        let mut state = self.inner.lock();
        let previous = state.phase;

        state.explicit_close = true;
        state.scheduler.cancel();
        state.generation += 1;
        state.outgoing = None;
        if let Some(session) = state.session.take() {
            session.abort();
        }
        state.phase = ConnectionState::Closed;
        state.resolve_waiters(|| Err(LookoutError::Disconnected));
        self.inner.connected.send_replace(false);

        info!(previous_state = ?previous, "Disconnected");
    }

    /// Send a frame now if open, otherwise queue it for the next open
    pub fn send(&self, frame: OutgoingFrame) {
        self.inner.lock().send(frame);
    }

    /// Register a listener for `channel`.
    ///
    /// The first listener on a channel sends a subscribe frame; later ones
    /// only join the local fan-out. Starts the connection if it is idle.
    pub fn subscribe<F>(&self, channel: impl Into<String>, callback: F) -> SubscriptionHandle
    where
        F: Fn(&IncomingFrame) -> Result<(), LookoutError> + Send + Sync + 'static,
    {
        self.subscribe_with(channel, Arc::new(callback))
    }

    pub fn subscribe_with(
        &self,
        channel: impl Into<String>,
        callback: ChannelCallback,
    ) -> SubscriptionHandle {
        let channel = channel.into();
        let mut state = self.inner.lock();

        let registration = state.registry.add(&channel, callback);
        if registration.first_listener {
            info!(channel = %channel, "Subscribing to channel");
            state.send(OutgoingFrame::subscribe(channel.as_str()));
        }

        if state.phase == ConnectionState::Closed && !state.scheduler.is_pending() {
            state.explicit_close = false;
            self.inner.begin_attempt(&mut state);
        }

        SubscriptionHandle {
            id: registration.id,
            channel,
            client: Arc::downgrade(&self.inner),
        }
    }

    /// Whether the link is currently open
    pub fn connected(&self) -> bool {
        *self.inner.connected.borrow()
    }

    /// Observe changes of the `connected` flag
    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.inner.connected.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().phase
    }

    pub fn active_channels(&self) -> Vec<String> {
        self.inner.lock().registry.active_channels()
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner.lock().registry.listener_count(channel)
    }

    /// Frames waiting for the next open
    pub fn queued_frames(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.lock().scheduler.attempt()
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.inner.lock().scheduler.is_pending()
    }

    pub fn transport_info(&self) -> TransportInfo {
        self.inner.transport.info()
    }
}

impl fmt::Debug for LookoutClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("LookoutClient")
            .field("state", &state.phase)
            .field("channels", &state.registry.active_channels())
            .field("queued", &state.queue.len())
            .finish()
    }
}

/// Handle for one registered listener
#[must_use = "the listener stays registered until unsubscribe() is called"]
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: ListenerId,
    channel: String,
    client: Weak<ClientInner>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Remove exactly this listener; calling it again is a no-op.
    ///
    /// No dispatch that starts after this returns reaches the listener. An
    /// invocation already running on another runtime thread may still finish.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.client.upgrade() {
            inner.remove_listener(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.client
            .upgrade()
            .is_some_and(|inner| inner.lock().registry.contains(self.id))
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish()
    }
}
