use super::registry::EventRegistry;
use super::session::{Rejected, SessionUpdate};
use crate::types::EventMessage;
use crate::types::constants::server_events;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Routes inbound server events to the typed session bus and to named handlers
#[derive(Clone)]
pub struct EventRouter {
    registry: Arc<EventRegistry>,
    sessions: broadcast::Sender<SessionUpdate>,
}

impl EventRouter {
    pub fn new(registry: Arc<EventRegistry>, sessions: broadcast::Sender<SessionUpdate>) -> Self {
        Self { registry, sessions }
    }

    /// Routes a message to the appropriate handler(s)
    pub fn route(&self, message: EventMessage) {
        match message.event.as_str() {
            server_events::CONNECTED => {
                tracing::info!("Server confirmed connection: {}", message.payload);
            }
            server_events::INIT_DONE => {
                tracing::info!("Server initialization done: {}", message.payload);
            }
            server_events::PONG => {
                tracing::debug!("Pong received: {}", message.payload);
            }
            server_events::SESSION_UPDATE => self.publish_session_update(&message),
            _ => {}
        }

        let handled = self.registry.dispatch(&message.event, &message.payload);
        tracing::debug!("Dispatched event {} to {} handler(s)", message.event, handled);
    }

    fn publish_session_update(&self, message: &EventMessage) {
        match SessionUpdate::parse(&message.payload) {
            Ok(update) => {
                tracing::debug!(
                    "Session update: session={}, type={}",
                    update.session_id,
                    update.event
                );
                // No receivers is fine; nobody is listening to the bus yet
                let _ = self.sessions.send(update);
            }
            Err(Rejected::MissingSessionId) => {
                tracing::warn!("Session update missing session_id: {}", message.payload);
            }
            Err(Rejected::UnknownType(kind)) => {
                tracing::warn!("Unknown session update type: {}", kind);
            }
            Err(Rejected::Malformed(reason)) => {
                tracing::error!(
                    "Failed to parse session update: {} - Raw: {}",
                    reason,
                    message.payload
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::SessionEvent;
    use serde_json::json;
    use std::sync::Mutex;

    fn router() -> (EventRouter, Arc<EventRegistry>, broadcast::Receiver<SessionUpdate>) {
        let registry = Arc::new(EventRegistry::new());
        let (tx, rx) = broadcast::channel(8);
        (EventRouter::new(Arc::clone(&registry), tx), registry, rx)
    }

    #[test]
    fn test_session_update_reaches_bus_and_handlers() {
        let (router, registry, mut rx) = router();
        let raw = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&raw);
        registry.on("session_update", move |payload| {
            seen.lock().unwrap().push(payload.clone());
        });

        router.route(EventMessage::new(
            "session_update",
            json!({"session_id": "s1", "type": "delta", "text": "Hel"}),
        ));

        let update = rx.try_recv().unwrap();
        assert_eq!(update.session_id, "s1");
        assert_eq!(
            update.event,
            SessionEvent::Delta {
                text: "Hel".to_string()
            }
        );
        assert_eq!(raw.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_session_update_without_session_id_is_not_published() {
        let (router, _registry, mut rx) = router();
        router.route(EventMessage::new(
            "session_update",
            json!({"type": "info", "info": "orphan"}),
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_other_events_only_go_to_handlers() {
        let (router, registry, mut rx) = router();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        registry.on("init_done", move |_| *counter.lock().unwrap() += 1);

        router.route(EventMessage::new("init_done", json!({"ok": true})));

        assert_eq!(*hits.lock().unwrap(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_delivery_preserves_arrival_order() {
        let (router, _registry, mut rx) = router();
        for text in ["a", "b", "c"] {
            router.route(EventMessage::new(
                "session_update",
                json!({"session_id": "s1", "type": "delta", "text": text}),
            ));
        }

        let order: Vec<_> = (0..3)
            .map(|_| match rx.try_recv().unwrap().event {
                SessionEvent::Delta { text } => text,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
