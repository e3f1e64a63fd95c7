//! WebSocket transport implementation

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};
use url::Url;

use crate::config::WebSocketConfig;
use lookout_core::{LookoutError, Transport, TransportEvent, TransportInfo, TransportLink};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// WebSocket transport
///
/// Each [`Transport::open`] performs a fresh handshake and spawns one writer
/// and one reader task for the resulting socket.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    config: WebSocketConfig,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport. No connection is made until `open`.
    pub fn new(config: WebSocketConfig) -> Result<Self, LookoutError> {
        let url = Url::parse(&config.url).map_err(|e| {
            LookoutError::ConfigError(format!("Invalid WebSocket URL '{}': {}", config.url, e))
        })?;

        match url.scheme() {
            "ws" => {}
            "wss" if cfg!(feature = "tls") => {}
            "wss" => {
                return Err(LookoutError::ConfigError(format!(
                    "'{}' needs TLS; build with the `tls` feature",
                    config.url
                )))
            }
            other => {
                return Err(LookoutError::ConfigError(format!(
                    "WebSocket URL must use ws or wss, got '{}'",
                    other
                )))
            }
        }

        for (name, value) in &config.headers {
            header_pair(name, value)?;
        }

        Ok(Self { config })
    }

    /// Get the transport configuration
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    fn request(&self) -> Result<Request, LookoutError> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| LookoutError::ConfigError(format!("Invalid WebSocket request: {}", e)))?;

        for (name, value) in &self.config.headers {
            let (name, value) = header_pair(name, value)?;
            request.headers_mut().insert(name, value);
        }

        Ok(request)
    }

    fn ping_interval(&self) -> Option<Duration> {
        match self.config.ping_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), LookoutError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| LookoutError::ConfigError(format!("Invalid header name '{}': {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| LookoutError::ConfigError(format!("Invalid value for header '{}': {}", name, e)))?;
    Ok((header_name, header_value))
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn info(&self) -> TransportInfo {
        TransportInfo {
            name: "websocket".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoint: self.config.url.clone(),
        }
    }

    async fn open(&self) -> Result<TransportLink, LookoutError> {
        let request = self.request()?;
        let timeout = Duration::from_secs(self.config.connect_timeout_seconds);

        let (ws_stream, _) = match tokio::time::timeout(timeout, connect_async(request)).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(LookoutError::ConnectionError(format!(
                    "WebSocket connection to {} failed: {}",
                    self.config.url, e
                )))
            }
            Err(_) => {
                return Err(LookoutError::ConnectionError(format!(
                    "WebSocket handshake with {} timed out after {}s",
                    self.config.url, self.config.connect_timeout_seconds
                )))
            }
        };

        info!(url = %self.config.url, "Connected to WebSocket server");

        // Split the stream into read and write halves
        let (write, read) = ws_stream.split();

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        let ping = self
            .ping_interval()
            .map(|every| {
                let mut ticker = interval_at(Instant::now() + every, every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });

        tokio::spawn(write_loop(write, outgoing_rx, ping, incoming_tx.clone()));
        tokio::spawn(read_loop(read, incoming_tx));

        Ok(TransportLink {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }
}

fn link_failure(operation: &str, error: WsError) -> TransportEvent {
    let error = LookoutError::TransportError(format!("WebSocket {} failed: {}", operation, error));
    TransportEvent::Error(error.to_string())
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn write_loop(
    mut writer: WsWriter,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    mut ping: Option<Interval>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        tokio::select! {
            frame = outgoing.recv() => {
                let Some(text) = frame else {
                    // Client dropped the link
                    if let Err(e) = writer.close().await {
                        warn!(error = %e, "Failed to close WebSocket connection gracefully");
                    }
                    return;
                };

                lookout_core::trace_log!(frame = %text, "Writing WebSocket frame");

                if let Err(e) = writer.send(Message::text(text)).await {
                    let _ = events.send(link_failure("send", e));
                    return;
                }
            }
            _ = next_ping(&mut ping) => {
                if let Err(e) = writer.send(Message::Ping(Vec::<u8>::new().into())).await {
                    let _ = events.send(link_failure("ping", e));
                    return;
                }
            }
        }
    }
}

async fn read_loop(mut reader: WsReader, events: mpsc::UnboundedSender<TransportEvent>) {
    while let Some(message) = reader.next().await {
        let event = match message {
            Ok(Message::Text(text)) => TransportEvent::Message(text.as_str().to_string()),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => TransportEvent::Message(text),
                Err(_) => {
                    warn!(len = bytes.len(), "Ignoring non UTF-8 binary WebSocket frame");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.as_str().to_string())
                    .filter(|reason| !reason.is_empty());
                let _ = events.send(TransportEvent::Closed { reason });
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                let _ = events.send(link_failure("read", e));
                return;
            }
        };

        if events.send(event).is_err() {
            // Link was dropped by the client
            return;
        }
    }

    let _ = events.send(TransportEvent::Closed { reason: None });
}
