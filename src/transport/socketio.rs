use super::packet::{EnginePacket, Handshake, SocketPacket};
use super::{Transport, TransportEvent, TransportLink, TransportSink};
use crate::types::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_NAMESPACE, DEFAULT_PATH, ENGINE_IO_VERSION, EventMessage,
    INBOUND_BUFFER_SIZE, Result, SocketError, TRANSPORT_WEBSOCKET,
};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Socket.IO client transport over a plain WebSocket (no long-polling, no upgrade).
#[derive(Debug, Clone)]
pub struct SocketIoTransport {
    path: String,
    namespace: String,
    connect_timeout: Duration,
}

impl SocketIoTransport {
    pub fn new(
        path: impl Into<String>,
        namespace: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
            connect_timeout,
        }
    }

    /// Builds the Engine.IO WebSocket URL for a server origin.
    pub fn engine_url(&self, endpoint: &Url) -> Result<Url> {
        let scheme = match endpoint.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(SocketError::InvalidConfig(format!(
                    "unsupported URL scheme '{}'",
                    other
                )));
            }
        };

        let mut url = endpoint.clone();
        url.set_scheme(scheme).map_err(|_| {
            SocketError::InvalidConfig(format!("cannot use scheme '{}' for {}", scheme, endpoint))
        })?;
        url.set_path(&self.path);
        url.query_pairs_mut()
            .append_pair("EIO", ENGINE_IO_VERSION)
            .append_pair("transport", TRANSPORT_WEBSOCKET);
        Ok(url)
    }

    /// Runs the Engine.IO open and Socket.IO namespace connect exchange.
    async fn handshake(&self, url: &Url) -> Result<(Handshake, String, WsWriter, WsReader)> {
        let (ws_stream, _response) = connect_async(url.as_str()).await?;
        let (mut writer, mut reader) = ws_stream.split();

        let handshake = loop {
            match next_packet(&mut reader).await? {
                EnginePacket::Open(handshake) => break handshake,
                other => tracing::debug!("Ignoring {:?} before open packet", other),
            }
        };
        tracing::debug!(
            "Engine.IO open: sid={}, ping_interval={}ms, ping_timeout={}ms",
            handshake.sid,
            handshake.ping_interval,
            handshake.ping_timeout
        );

        let connect = EnginePacket::Message(SocketPacket::Connect {
            namespace: self.namespace.clone(),
            data: None,
        });
        writer.send(Message::Text(connect.encode()?.into())).await?;

        let connection_id = loop {
            match next_packet(&mut reader).await? {
                EnginePacket::Message(SocketPacket::Connect { namespace, data })
                    if namespace == self.namespace =>
                {
                    break data
                        .as_ref()
                        .and_then(|data| data.get("sid"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| handshake.sid.clone());
                }
                EnginePacket::Message(SocketPacket::ConnectError { data, .. }) => {
                    return Err(SocketError::Connection(
                        SocketPacket::connect_error_message(&data),
                    ));
                }
                EnginePacket::Ping(data) => {
                    let pong = EnginePacket::Pong(data).encode()?;
                    writer.send(Message::Text(pong.into())).await?;
                }
                EnginePacket::Close => {
                    return Err(SocketError::Connection(
                        "server closed the transport during handshake".to_string(),
                    ));
                }
                other => tracing::debug!("Ignoring {:?} during namespace connect", other),
            }
        };

        Ok((handshake, connection_id, writer, reader))
    }
}

impl Default for SocketIoTransport {
    fn default() -> Self {
        Self::new(
            DEFAULT_PATH,
            DEFAULT_NAMESPACE,
            Duration::from_millis(DEFAULT_CONNECT_TIMEOUT),
        )
    }
}

#[async_trait]
impl Transport for SocketIoTransport {
    async fn open(&self, endpoint: &Url) -> Result<TransportLink> {
        let url = self.engine_url(endpoint)?;
        tracing::debug!("Opening Socket.IO transport at {}", url);

        let (handshake, connection_id, writer, reader) =
            tokio::time::timeout(self.connect_timeout, self.handshake(&url))
                .await
                .map_err(|_| SocketError::Timeout)??;

        let writer = Arc::new(Mutex::new(writer));
        let (events_tx, events_rx) = mpsc::channel(INBOUND_BUFFER_SIZE);
        let silence_limit =
            Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);

        let reader_task = tokio::spawn(read_loop(
            reader,
            Arc::clone(&writer),
            events_tx,
            silence_limit,
            self.namespace.clone(),
        ));

        Ok(TransportLink {
            connection_id,
            sink: Box::new(SocketIoSink {
                writer,
                namespace: self.namespace.clone(),
                reader_task: std::sync::Mutex::new(Some(reader_task)),
            }),
            events: events_rx,
        })
    }
}

async fn next_packet(reader: &mut WsReader) -> Result<EnginePacket> {
    loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => return EnginePacket::decode(text.as_str()),
            Some(Ok(Message::Close(_))) | None => {
                return Err(SocketError::Connection(
                    "connection closed during handshake".to_string(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Reads packets until the link dies, answering server pings along the way.
///
/// The server pings every `pingInterval`; silence longer than
/// `pingInterval + pingTimeout` means the link is dead.
async fn read_loop(
    mut reader: WsReader,
    writer: Arc<Mutex<WsWriter>>,
    events: mpsc::Sender<TransportEvent>,
    silence_limit: Duration,
    namespace: String,
) {
    tracing::debug!("Starting Socket.IO read task");
    let reason = loop {
        let next = match tokio::time::timeout(silence_limit, reader.next()).await {
            Ok(next) => next,
            Err(_) => break "ping timeout".to_string(),
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                break match frame {
                    Some(close_frame) => format!(
                        "transport close: code={:?}, reason='{}'",
                        close_frame.code,
                        close_frame.reason.as_str()
                    ),
                    None => "transport close".to_string(),
                };
            }
            Some(Ok(Message::Binary(data))) => {
                tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                continue;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => break format!("transport error: {}", e),
            None => break "transport close".to_string(),
        };

        match EnginePacket::decode(text.as_str()) {
            Ok(EnginePacket::Ping(data)) => {
                let pong = match EnginePacket::Pong(data).encode() {
                    Ok(pong) => pong,
                    Err(e) => break format!("transport error: {}", e),
                };
                if let Err(e) = writer.lock().await.send(Message::Text(pong.into())).await {
                    break format!("transport error: {}", e);
                }
            }
            Ok(EnginePacket::Message(SocketPacket::Event {
                namespace: packet_namespace,
                message,
                ..
            })) if packet_namespace == namespace => {
                if events.send(TransportEvent::Message(message)).await.is_err() {
                    tracing::debug!("Event receiver dropped, stopping read task");
                    return;
                }
            }
            Ok(EnginePacket::Message(SocketPacket::Disconnect {
                namespace: packet_namespace,
            })) if packet_namespace == namespace => {
                break "io server disconnect".to_string();
            }
            Ok(EnginePacket::Close) => break "transport close".to_string(),
            Ok(other) => tracing::debug!("Ignoring packet {:?}", other),
            Err(e) => {
                tracing::error!("Failed to parse packet: {} - Raw: {}", e, text.as_str());
            }
        }
    };

    tracing::debug!("Socket.IO read task finished: {}", reason);
    let _ = events.send(TransportEvent::Closed(reason)).await;
}

struct SocketIoSink {
    writer: Arc<Mutex<WsWriter>>,
    namespace: String,
    reader_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SocketIoSink {
    fn take_reader(&self) -> Option<JoinHandle<()>> {
        self.reader_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl TransportSink for SocketIoSink {
    async fn emit(&self, message: EventMessage) -> Result<()> {
        let packet = EnginePacket::Message(SocketPacket::Event {
            namespace: self.namespace.clone(),
            ack_id: None,
            message,
        });
        let text = packet.encode()?;
        self.writer
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(reader) = self.take_reader() else {
            return Ok(());
        };
        reader.abort();

        let disconnect = EnginePacket::Message(SocketPacket::Disconnect {
            namespace: self.namespace.clone(),
        })
        .encode()?;

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.send(Message::Text(disconnect.into())).await {
            tracing::debug!("Could not send namespace disconnect: {}", e);
        }
        writer.close().await?;
        Ok(())
    }
}

impl Drop for SocketIoSink {
    fn drop(&mut self) {
        if let Some(reader) = self.take_reader() {
            reader.abort();
        }
    }
}
