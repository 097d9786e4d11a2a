use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Handler = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Identifies one registered handler, for [`EventRegistry::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Named event handlers, invoked in registration order.
///
/// Dispatch runs over a snapshot of the handler list taken before the first handler is
/// called, with no lock held, so handlers may register or remove handlers (including
/// themselves) while being invoked. Such changes take effect from the next dispatch.
pub struct EventRegistry {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<(HandlerId, Handler)>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if it was not registered for `event`.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Invokes every handler registered for `event`; returns how many ran.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let snapshot: Vec<Handler> = match self.lock().get(event) {
            Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
            None => return 0,
        };

        for handler in &snapshot {
            handler(payload);
        }
        snapshot.len()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<(HandlerId, Handler)>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::OnceLock;

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = EventRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            registry.on("session_update", move |_| calls.lock().unwrap().push(label));
        }

        assert_eq!(registry.dispatch("session_update", &json!({})), 3);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_only_matching_event() {
        let registry = EventRegistry::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        registry.on("pong", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(registry.dispatch("init_done", &Value::Null), 0);
        assert_eq!(registry.dispatch("pong", &Value::Null), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_removes_handler() {
        let registry = EventRegistry::new();
        let id = registry.on("pong", |_| {});
        assert!(registry.off("pong", id));
        assert!(!registry.off("pong", id));
        assert_eq!(registry.handler_count("pong"), 0);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself_during_dispatch() {
        let registry = Arc::new(EventRegistry::new());
        let own_id: Arc<OnceLock<HandlerId>> = Arc::new(OnceLock::new());
        let later_calls = Arc::new(AtomicU64::new(0));

        let weak = Arc::downgrade(&registry);
        let id_cell = Arc::clone(&own_id);
        let id = registry.on("session_update", move |_| {
            if let (Some(registry), Some(id)) = (weak.upgrade(), id_cell.get()) {
                registry.off("session_update", *id);
            }
        });
        own_id.set(id).unwrap();

        let counter = Arc::clone(&later_calls);
        registry.on("session_update", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(registry.dispatch("session_update", &Value::Null), 2);
        assert_eq!(later_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.handler_count("session_update"), 1);

        assert_eq!(registry.dispatch("session_update", &Value::Null), 1);
        assert_eq!(later_calls.load(Ordering::SeqCst), 2);
    }
}
