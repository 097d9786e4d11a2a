use super::{
    ConnectionState, ConnectionStatus, ManagerState, SocketManagerBuilder, SocketManagerOptions,
};
use crate::infrastructure::Backoff;
use crate::messaging::{EventRegistry, EventRouter, HandlerId, SessionUpdate};
use crate::transport::{Transport, TransportEvent, TransportLink};
use crate::types::{EventMessage, Result, SocketError, client_events};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use url::Url;

/// Owns the single Socket.IO connection to the backend.
///
/// `SocketManager` keeps at most one live transport, retries failed or lost connections
/// with a bounded backoff of its own, publishes every state transition, and fans inbound
/// server events out to named handlers. Connection failures never surface as errors;
/// they are recorded in [`ConnectionState`].
///
/// # Example
///
/// ```no_run
/// use jaaz_realtime::{SocketManager, SocketManagerOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = SocketManager::new("http://localhost:57988", SocketManagerOptions::default())?;
///
/// manager.on("init_done", |payload| println!("server ready: {}", payload));
///
/// let state = manager.connect().await;
/// println!("status: {:?}", state.status);
///
/// manager.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SocketManager {
    pub(crate) endpoint: Url,
    pub(crate) options: SocketManagerOptions,
    pub(crate) backoff: Backoff,
    pub(crate) transport: Arc<dyn Transport>,

    // Inbound event fan-out
    pub(crate) registry: Arc<EventRegistry>,
    pub(crate) router: EventRouter,
    pub(crate) sessions: broadcast::Sender<SessionUpdate>,

    // Connectivity publication
    pub(crate) transitions: broadcast::Sender<ConnectionState>,
    pub(crate) state_rx: watch::Receiver<ConnectionState>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ManagerState>>,
}

impl SocketManager {
    /// Creates a manager for `server_url` (usually the origin serving the app).
    ///
    /// No connection is opened unless `options.auto_connect` is set. With `auto_connect`
    /// the first attempt is spawned, so this must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::UrlParse`] for a malformed URL and
    /// [`SocketError::InvalidConfig`] for unusable options.
    pub fn new(server_url: impl AsRef<str>, options: SocketManagerOptions) -> Result<Self> {
        SocketManagerBuilder::new(server_url, options).map(|builder| builder.build())
    }

    pub fn builder(
        server_url: impl AsRef<str>,
        options: SocketManagerOptions,
    ) -> Result<SocketManagerBuilder> {
        SocketManagerBuilder::new(server_url, options)
    }

    /// Opens the connection unless one is already open or being opened.
    ///
    /// Resolves once this attempt has either connected or failed and returns the state at
    /// that point. A failed attempt leaves the manager `Errored` with a retry scheduled,
    /// unless the maximum number of consecutive failures has been reached.
    pub async fn connect(&self) -> ConnectionState {
        let epoch = {
            let mut state = self.state.write().await;
            if matches!(
                state.status(),
                ConnectionStatus::Connecting | ConnectionStatus::Connected
            ) {
                return state.snapshot();
            }
            state.cancel_reconnect();
            state.enter_connecting();
            state.epoch
        };

        self.attempt(epoch).await
    }

    /// Manual reconnect: clears the attempt counter, then connects with a fresh retry sequence.
    pub async fn reconnect(&self) -> ConnectionState {
        self.state.write().await.reset_attempts();
        self.connect().await
    }

    /// Tears the connection down, also mid-attempt, and cancels any pending retry.
    ///
    /// Safe to call any number of times. Afterwards the manager stays `Disconnected`
    /// until [`connect()`](Self::connect) is called again.
    pub async fn disconnect(&self) {
        let sink = {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.enter_disconnected()
        };

        if let Some(sink) = sink {
            if let Err(e) = sink.close().await {
                tracing::debug!("Transport close reported: {}", e);
            }
            tracing::info!("Disconnected from {}", self.endpoint);
        }
    }

    /// Current connectivity snapshot
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state_rx.borrow().status
    }

    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().is_connected()
    }

    pub fn connection_id(&self) -> Option<String> {
        self.state_rx.borrow().connection_id.clone()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.state_rx.borrow().reconnect_attempts
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.options.max_reconnect_attempts
    }

    pub fn is_max_reconnect_attempts_reached(&self) -> bool {
        self.state_rx.borrow().is_max_reconnect_attempts_reached()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state_rx.borrow().last_error.clone()
    }

    /// Every state transition, in order, from now on
    pub fn subscribe_state(&self) -> broadcast::Receiver<ConnectionState> {
        self.transitions.subscribe()
    }

    /// The latest state, skipping intermediate transitions a slow reader missed
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Typed `session_update` events
    pub fn session_updates(&self) -> broadcast::Receiver<SessionUpdate> {
        self.sessions.subscribe()
    }

    /// Registers `handler` for inbound events named `event`.
    ///
    /// Handlers run on the connection's reader task in registration order and must not
    /// block. They survive reconnects.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.registry.on(event, handler)
    }

    /// Removes a handler registered with [`on()`](Self::on); safe to call from inside a handler.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.registry.off(event, id)
    }

    /// Sends an event to the server.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::NotConnected`] unless the manager is connected.
    pub async fn emit(&self, event: impl Into<String>, payload: Value) -> Result<()> {
        let sink = {
            let state = self.state.read().await;
            match (&state.sink, state.status()) {
                (Some(sink), ConnectionStatus::Connected) => Arc::clone(sink),
                _ => return Err(SocketError::NotConnected),
            }
        };

        sink.emit(EventMessage::new(event, payload)).await
    }

    /// Application-level ping; the server answers with a `pong` event
    pub async fn ping(&self, payload: Value) -> Result<()> {
        self.emit(client_events::PING, payload).await
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn attempt(&self, epoch: u64) -> ConnectionState {
        tracing::info!("Connecting to {}", self.endpoint);
        let outcome = self.transport.open(&self.endpoint).await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            // disconnect() ran while the transport was opening
            drop(state);
            if let Ok(link) = outcome {
                tracing::debug!("Discarding link {} opened after disconnect", link.connection_id);
                if let Err(e) = link.sink.close().await {
                    tracing::debug!("Transport close reported: {}", e);
                }
            }
            return self.state();
        }

        match outcome {
            Ok(link) => self.on_connected(&mut state, link, epoch),
            Err(e) => {
                tracing::error!("Connection attempt failed: {}", e);
                self.on_failure(&mut state, e.to_string());
            }
        }
        state.snapshot()
    }

    fn on_connected(&self, state: &mut ManagerState, link: TransportLink, epoch: u64) {
        let TransportLink {
            connection_id,
            sink,
            events,
        } = link;

        self.spawn_reader(state, events, epoch);
        tracing::info!("Connected to {} as {}", self.endpoint, connection_id);
        state.enter_connected(connection_id, Arc::from(sink));
    }

    fn on_failure(&self, state: &mut ManagerState, reason: String) {
        state.enter_errored(reason);

        if state.can_retry() {
            self.schedule_reconnect(state);
        } else {
            tracing::warn!(
                "Failed to connect after {} attempts, giving up until reconnected manually",
                state.reconnect_attempts()
            );
        }
    }

    fn schedule_reconnect(&self, state: &mut ManagerState) {
        let attempts = state.reconnect_attempts();
        let delay = self.backoff.delay_for(attempts);
        let epoch = state.epoch;
        tracing::info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            attempts,
            state.max_reconnect_attempts()
        );

        let manager = self.clone();
        state.cancel_reconnect();
        state.reconnect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.resume(epoch).await;
        }));
    }

    /// Body of a scheduled retry
    async fn resume(&self, epoch: u64) {
        {
            let mut state = self.state.write().await;
            if state.epoch != epoch || state.status() != ConnectionStatus::Errored {
                return;
            }
            // This task is the scheduled one; detach it so a later cancel can't abort it mid-attempt
            state.reconnect_task = None;
            state.enter_connecting();
        }

        self.attempt(epoch).await;
    }

    fn spawn_reader(
        &self,
        state: &mut ManagerState,
        mut events: mpsc::Receiver<TransportEvent>,
        epoch: u64,
    ) {
        let manager = self.clone();
        state.task_manager.spawn(async move {
            tracing::debug!("Starting event reader");
            let reason = loop {
                match events.recv().await {
                    Some(TransportEvent::Message(message)) => manager.router.route(message),
                    Some(TransportEvent::Closed(reason)) => break reason,
                    None => break "transport closed".to_string(),
                }
            };
            manager.on_connection_lost(epoch, reason).await;
        });
    }

    async fn on_connection_lost(&self, epoch: u64, reason: String) {
        let mut state = self.state.write().await;
        if state.epoch != epoch || state.status() != ConnectionStatus::Connected {
            return;
        }

        tracing::warn!("Connection lost: {}", reason);
        self.on_failure(&mut state, reason);
    }
}
