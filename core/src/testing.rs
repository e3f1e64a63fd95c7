//! Scripted in-memory transport for connection manager tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::errors::LookoutError;
use crate::transport::{Transport, TransportEvent, TransportInfo, TransportLink};

/// Server side of one link opened through [`MockTransport`]
pub(crate) struct MockPeer {
    pub(crate) sent: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
}

impl MockPeer {
    /// Frames the client has written so far
    pub(crate) fn frames(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.sent.try_recv() {
            frames.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
        }
        frames
    }

    pub(crate) fn push(&self, frame: Value) {
        self.push_raw(&frame.to_string());
    }

    pub(crate) fn push_raw(&self, text: &str) {
        let _ = self.inbound.send(TransportEvent::Message(text.to_string()));
    }

    pub(crate) fn close(&self) {
        let _ = self.inbound.send(TransportEvent::Closed {
            reason: Some("server restart".to_string()),
        });
    }

    pub(crate) fn fail(&self, error: &str) {
        let _ = self.inbound.send(TransportEvent::Error(error.to_string()));
    }
}

#[derive(Default)]
struct Script {
    refusals: usize,
    open_delay: Option<Duration>,
}

pub(crate) struct MockTransport {
    script: Mutex<Script>,
    opens: Mutex<Vec<Instant>>,
    open_count: AtomicUsize,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockTransport {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            script: Mutex::new(Script::default()),
            opens: Mutex::new(Vec::new()),
            open_count: AtomicUsize::new(0),
            peers,
        });
        (transport, rx)
    }

    /// Fail the next `count` open attempts
    pub(crate) fn refuse_next(&self, count: usize) {
        self.script.lock().unwrap().refusals = count;
    }

    pub(crate) fn set_open_delay(&self, delay: Duration) {
        self.script.lock().unwrap().open_delay = Some(delay);
    }

    pub(crate) fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    pub(crate) fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn info(&self) -> TransportInfo {
        TransportInfo {
            name: "mock".to_string(),
            version: "0.0.0".to_string(),
            endpoint: "mock://dashboard".to_string(),
        }
    }

    async fn open(&self) -> Result<TransportLink, LookoutError> {
        self.opens.lock().unwrap().push(Instant::now());
        self.open_count.fetch_add(1, Ordering::SeqCst);

        let (refuse, delay) = {
            let mut script = self.script.lock().unwrap();
            let refuse = script.refusals > 0;
            if refuse {
                script.refusals -= 1;
            }
            (refuse, script.open_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if refuse {
            return Err(LookoutError::ConnectionError("connection refused".to_string()));
        }

        let (outgoing, sent) = mpsc::unbounded_channel();
        let (inbound, incoming) = mpsc::unbounded_channel();
        let _ = self.peers.send(MockPeer { sent, inbound });

        Ok(TransportLink { outgoing, incoming })
    }
}

/// Wait for the client to open its next link
pub(crate) async fn next_peer(peers: &mut mpsc::UnboundedReceiver<MockPeer>) -> MockPeer {
    tokio::time::timeout(Duration::from_secs(300), peers.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("mock transport dropped")
}

/// Let every ready task run without crossing any pending retry timer
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
