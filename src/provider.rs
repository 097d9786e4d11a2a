//! Application-level owner of the socket manager and the notification log.

use crate::client::{ConnectionState, ConnectionStatus, SocketManager};
use crate::notifications::{NotificationFeed, NotificationStore};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Connectivity as presented to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketContext {
    pub connected: bool,
    pub connecting: bool,
    pub error: Option<String>,
    pub socket_id: Option<String>,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
}

impl From<&ConnectionState> for SocketContext {
    fn from(state: &ConnectionState) -> Self {
        Self {
            connected: state.is_connected(),
            connecting: state.is_connecting(),
            error: state.last_error.clone(),
            socket_id: state.connection_id.clone(),
            reconnect_attempts: state.reconnect_attempts,
            max_reconnect_attempts: state.max_reconnect_attempts,
        }
    }
}

impl SocketContext {
    /// Banner text for a failing connection; `None` while nothing is wrong.
    pub fn status_message(&self) -> Option<String> {
        let error = self.error.as_deref()?;
        if self.connected {
            return None;
        }
        if self.reconnect_attempts >= self.max_reconnect_attempts {
            return Some("Connection lost: maximum reconnection attempts reached".to_string());
        }
        Some(format!(
            "Connection error ({}/{}): {}",
            self.reconnect_attempts, self.max_reconnect_attempts, error
        ))
    }
}

/// Wires a [`SocketManager`] to a [`NotificationStore`] through a [`NotificationFeed`].
///
/// Must be created inside a tokio runtime; the feed task starts immediately.
pub struct SocketProvider {
    manager: SocketManager,
    feed: NotificationFeed,
    feed_task: Mutex<Option<JoinHandle<()>>>,
}

impl SocketProvider {
    pub fn new(manager: SocketManager, store: NotificationStore) -> Self {
        let feed = NotificationFeed::new(store);
        let feed_task = feed.clone().spawn(manager.session_updates());

        Self {
            manager,
            feed,
            feed_task: Mutex::new(Some(feed_task)),
        }
    }

    /// Connects and returns the resulting context.
    pub async fn start(&self) -> SocketContext {
        let state = self.manager.connect().await;
        if state.status == ConnectionStatus::Errored {
            tracing::warn!(
                "Initial connection failed: {}",
                state.last_error.as_deref().unwrap_or("unknown error")
            );
        }
        SocketContext::from(&state)
    }

    pub fn context(&self) -> SocketContext {
        SocketContext::from(&self.manager.state())
    }

    pub fn manager(&self) -> &SocketManager {
        &self.manager
    }

    pub fn notifications(&self) -> &NotificationStore {
        self.feed.store()
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    /// Disconnects and stops turning session updates into notifications.
    pub async fn shutdown(&self) {
        self.manager.disconnect().await;
        let task = self
            .feed_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl Drop for SocketProvider {
    fn drop(&mut self) {
        let task = self
            .feed_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SocketManagerOptions;
    use crate::notifications::NotificationKind;
    use crate::transport::fake::FakeTransport;
    use crate::types::DEFAULT_NOTIFICATION_CAPACITY;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn provider_with(transport: &FakeTransport) -> SocketProvider {
        let manager =
            SocketManager::builder("http://localhost:57988", SocketManagerOptions::default())
                .unwrap()
                .transport(Arc::new(transport.clone()))
                .build();
        SocketProvider::new(
            manager,
            NotificationStore::with_capacity(DEFAULT_NOTIFICATION_CAPACITY),
        )
    }

    fn context(attempts: u32, error: Option<&str>) -> SocketContext {
        SocketContext {
            connected: false,
            connecting: false,
            error: error.map(str::to_string),
            socket_id: None,
            reconnect_attempts: attempts,
            max_reconnect_attempts: 5,
        }
    }

    #[test]
    fn test_status_message() {
        assert_eq!(context(0, None).status_message(), None);
        assert_eq!(
            context(2, Some("connection refused")).status_message().as_deref(),
            Some("Connection error (2/5): connection refused")
        );
        assert_eq!(
            context(5, Some("connection refused")).status_message().as_deref(),
            Some("Connection lost: maximum reconnection attempts reached")
        );
    }

    #[tokio::test]
    async fn test_start_reports_connected_context() {
        let transport = FakeTransport::accepting();
        let provider = provider_with(&transport);

        let context = provider.start().await;

        assert!(context.connected);
        assert!(!context.connecting);
        assert_eq!(context.socket_id.as_deref(), Some("sid-1"));
        assert_eq!(context.max_reconnect_attempts, 5);
        assert_eq!(provider.context(), context);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reports_failure() {
        let transport = FakeTransport::refusing();
        let provider = provider_with(&transport);

        let context = provider.start().await;

        assert!(!context.connected);
        assert_eq!(context.reconnect_attempts, 1);
        assert_eq!(
            context.status_message().as_deref(),
            Some("Connection error (1/5): connection refused")
        );
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_session_updates_reach_the_store() {
        let transport = FakeTransport::accepting();
        let provider = provider_with(&transport);
        provider.start().await;

        transport
            .server(0)
            .push(
                "session_update",
                json!({
                    "session_id": "s1",
                    "type": "image_generated",
                    "canvas_id": "c1",
                    "image_url": "/api/file/a.png",
                }),
            )
            .await;

        let store = provider.notifications();
        tokio::time::timeout(Duration::from_secs(1), async {
            while store.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let notifications = store.get_canvas_notifications("c1");
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::CanvasUpdate);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects() {
        let transport = FakeTransport::accepting();
        let provider = provider_with(&transport);
        provider.start().await;

        provider.shutdown().await;

        let context = provider.context();
        assert!(!context.connected);
        assert!(context.socket_id.is_none());
        assert!(transport.server(0).is_closed());
        provider.shutdown().await;
    }
}
