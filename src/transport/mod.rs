//! Transport seam between the connection manager and the network.
//!
//! The manager only ever sees a [`Transport`] that can open a [`TransportLink`]. A link
//! carries the server-assigned connection id, a [`TransportSink`] for outbound events and
//! a stream of [`TransportEvent`]s. Transport-level reconnection is never attempted here;
//! when a link dies it reports [`TransportEvent::Closed`] and the manager decides what
//! happens next.

pub mod packet;
pub mod socketio;

#[cfg(test)]
pub(crate) mod fake;

use crate::types::{EventMessage, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

pub use socketio::SocketIoTransport;

/// Something the transport observed on a live link
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Inbound application event
    Message(EventMessage),
    /// The link is gone; no further events follow
    Closed(String),
}

/// Outbound half of an open link
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn emit(&self, message: EventMessage) -> Result<()>;

    /// Closes the link. Calling it more than once is harmless.
    async fn close(&self) -> Result<()>;
}

/// An established connection handed over to the manager
pub struct TransportLink {
    pub connection_id: String,
    pub sink: Box<dyn TransportSink>,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl std::fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink")
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a new link to `endpoint`, resolving once the server has accepted it.
    async fn open(&self, endpoint: &Url) -> Result<TransportLink>;
}
