use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors that can occur when using the realtime client.
///
/// Connection failures are never returned from [`connect()`](crate::SocketManager::connect);
/// they are recorded in [`ConnectionState`](crate::ConnectionState) instead. The variants
/// below surface from construction, from emitting events, and from transport internals.
#[derive(Error, Debug)]
pub enum SocketError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed or unexpected Engine.IO / Socket.IO packet
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed server URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Options rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation timed out (e.g., handshake not completed in time)
    #[error("Timeout error")]
    Timeout,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,
}

/// Convenience type alias for `Result<T, SocketError>`.
pub type Result<T> = std::result::Result<T, SocketError>;
