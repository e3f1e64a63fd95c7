//! Error types for Lookout

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookoutError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Client disconnected")]
    Disconnected,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Callback execution error: {0}")]
    CallbackError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
