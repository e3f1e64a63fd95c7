//! In-process WebSocket server used by the integration tests

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// One accepted client connection, seen from the server
pub struct ServerConnection {
    pub path: String,
    received: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl ServerConnection {
    /// Next frame the client wrote, decoded as JSON
    pub async fn next_frame(&mut self) -> Value {
        let text = timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client connection closed");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Whether the client closes the connection within the wait window
    pub async fn closed_by_client(&mut self) -> bool {
        loop {
            match timeout(WAIT, self.received.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return true,
                Err(_) => return false,
            }
        }
    }

    pub fn send(&self, frame: &Value) {
        self.send_raw(&frame.to_string());
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.outbound.send(Message::text(text.to_string()));
    }

    /// Close the connection from the server side
    pub fn close(self) {
        let _ = self.outbound.send(Message::Close(None));
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<ServerConnection>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, connections) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, tx.clone()));
            }
        });

        Self {
            addr,
            connections,
            task,
        }
    }

    /// Application URL whose derived socket URL points at this server
    pub fn app_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn next_connection(&mut self) -> ServerConnection {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a client connection")
            .expect("server stopped")
    }

    /// Whether a client connects within `window`
    pub async fn connects_within(&mut self, window: Duration) -> bool {
        timeout(window, self.connections.recv()).await.is_ok()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_connection(stream: TcpStream, connections: mpsc::UnboundedSender<ServerConnection>) {
    let mut path = String::new();
    let record_path = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };

    let Ok(ws_stream) = accept_hdr_async(stream, record_path).await else {
        return;
    };

    let (mut write, mut read) = ws_stream.split();
    let (received_tx, received) = mpsc::unbounded_channel();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    if connections
        .send(ServerConnection {
            path,
            received,
            outbound,
        })
        .is_err()
    {
        return;
    }

    let mut server_side_open = true;
    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = received_tx.send(text.as_str().to_string());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            message = outbound_rx.recv(), if server_side_open => match message {
                Some(message) => {
                    let closing = matches!(message, Message::Close(_));
                    if write.send(message).await.is_err() || closing {
                        break;
                    }
                }
                None => server_side_open = false,
            },
        }
    }
}
