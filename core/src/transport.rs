//! Transport trait for the single multiplexed connection

use crate::errors::LookoutError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Transport metadata
#[derive(Debug, Clone)]
pub struct TransportInfo {
    /// Transport name (e.g., "websocket")
    pub name: String,
    /// Transport version
    pub version: String,
    /// Remote endpoint the transport connects to
    pub endpoint: String,
}

/// Something that happened on an open link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame from the server
    Message(String),
    /// A transport-level failure; the link is treated as closed
    Error(String),
    /// The remote side closed the link
    Closed { reason: Option<String> },
}

/// An open bidirectional link.
///
/// Dropping `outgoing` closes the link. The transport stops delivering
/// `incoming` events once the link is gone.
pub struct TransportLink {
    pub outgoing: mpsc::UnboundedSender<String>,
    pub incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens links to the event backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Get transport information
    fn info(&self) -> TransportInfo;

    /// Open a new link, resolving once it is ready to carry frames
    async fn open(&self) -> Result<TransportLink, LookoutError>;
}
