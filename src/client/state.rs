use super::connection::{ConnectionState, ConnectionStatus};
use crate::infrastructure::TaskManager;
use crate::transport::TransportSink;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Consolidated mutable state for SocketManager.
///
/// Status fields only change through the `enter_*` transitions, which keep
/// `connection_id` and `sink` present exactly while connected.
pub struct ManagerState {
    status: ConnectionStatus,
    connection_id: Option<String>,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
    last_error: Option<String>,

    /// Bumped by every explicit disconnect; work tagged with an older epoch is stale
    pub epoch: u64,

    /// Outbound half of the live link
    pub sink: Option<Arc<dyn TransportSink>>,

    /// Reader task of the live link
    pub task_manager: TaskManager,

    /// Pending automatic reconnect, if one is scheduled
    pub reconnect_task: Option<JoinHandle<()>>,

    state_tx: watch::Sender<ConnectionState>,
    transitions_tx: broadcast::Sender<ConnectionState>,
}

impl ManagerState {
    pub fn new(
        max_reconnect_attempts: u32,
        state_tx: watch::Sender<ConnectionState>,
        transitions_tx: broadcast::Sender<ConnectionState>,
    ) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            connection_id: None,
            reconnect_attempts: 0,
            max_reconnect_attempts,
            last_error: None,
            epoch: 0,
            sink: None,
            task_manager: TaskManager::new(),
            reconnect_task: None,
            state_tx,
            transitions_tx,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }

    pub fn can_retry(&self) -> bool {
        self.reconnect_attempts < self.max_reconnect_attempts
    }

    pub fn snapshot(&self) -> ConnectionState {
        ConnectionState {
            status: self.status,
            connection_id: self.connection_id.clone(),
            reconnect_attempts: self.reconnect_attempts,
            max_reconnect_attempts: self.max_reconnect_attempts,
            last_error: self.last_error.clone(),
        }
    }

    pub fn enter_connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
        self.connection_id = None;
        self.publish();
    }

    pub fn enter_connected(&mut self, connection_id: String, sink: Arc<dyn TransportSink>) {
        self.status = ConnectionStatus::Connected;
        self.connection_id = Some(connection_id);
        self.sink = Some(sink);
        self.reconnect_attempts = 0;
        self.last_error = None;
        self.publish();
    }

    /// Records a failed attempt or a lost link. The attempt counter never passes the maximum.
    pub fn enter_errored(&mut self, reason: String) {
        self.release_link();
        self.status = ConnectionStatus::Errored;
        self.connection_id = None;
        self.reconnect_attempts = (self.reconnect_attempts + 1).min(self.max_reconnect_attempts);
        self.last_error = Some(reason);
        self.publish();
    }

    /// Returns the sink of the released link so the caller can close it outside the lock.
    pub fn enter_disconnected(&mut self) -> Option<Arc<dyn TransportSink>> {
        self.cancel_reconnect();
        let sink = self.release_link();
        let changed = self.status != ConnectionStatus::Disconnected
            || self.reconnect_attempts != 0
            || self.last_error.is_some();

        self.status = ConnectionStatus::Disconnected;
        self.connection_id = None;
        self.reconnect_attempts = 0;
        self.last_error = None;
        if changed {
            self.publish();
        }
        sink
    }

    pub fn reset_attempts(&mut self) {
        if self.reconnect_attempts != 0 {
            self.reconnect_attempts = 0;
            self.publish();
        }
    }

    pub fn cancel_reconnect(&mut self) {
        if let Some(task) = self.reconnect_task.take() {
            task.abort();
        }
    }

    fn release_link(&mut self) -> Option<Arc<dyn TransportSink>> {
        self.task_manager.abort_all();
        self.sink.take()
    }

    /// Notify state watchers
    fn publish(&self) {
        let snapshot = self.snapshot();
        if self.transitions_tx.send(snapshot.clone()).is_err() {
            tracing::trace!("No transition subscribers for state {:?}", snapshot.status);
        }
        self.state_tx.send_replace(snapshot);
    }
}
