use super::model::{ContextKind, NewNotification, Notification};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Listener = Arc<dyn Fn(&[Notification]) + Send + Sync + 'static>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Snapshots waiting to be delivered, in the order their mutations were applied
#[derive(Default)]
struct Fanout {
    pending: VecDeque<Vec<Notification>>,
    delivering: bool,
}

/// In-memory log of user-facing notifications, oldest first.
///
/// Cloning yields another handle to the same log. Every mutating call notifies each
/// subscriber exactly once with the full list, after the change has been applied and
/// with no lock held, so subscribers may call back into the store.
///
/// Snapshots are queued while the entries lock is held and delivered by one thread at a
/// time, so subscribers see them in mutation order even when several threads write
/// concurrently. A call made while another thread is delivering may return before its
/// own snapshot has been delivered; that thread delivers it.
#[derive(Clone)]
pub struct NotificationStore {
    entries: Arc<Mutex<Vec<Notification>>>,
    listeners: Arc<Mutex<Listeners>>,
    fanout: Arc<Mutex<Fanout>>,
    capacity: Option<usize>,
}

impl NotificationStore {
    /// Unbounded store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            fanout: Arc::new(Mutex::new(Fanout::default())),
            capacity: None,
        }
    }

    /// Store keeping at most `capacity` notifications, dropping the oldest first
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::new()
        }
    }

    /// Appends a notification with a fresh id, unread.
    pub fn add(&self, new: NewNotification) -> Notification {
        let notification = Notification::create(new);
        let mut entries = self.entries();
        entries.push(notification.clone());
        if let Some(capacity) = self.capacity
            && entries.len() > capacity
        {
            let excess = entries.len() - capacity;
            entries.drain(..excess);
        }

        tracing::debug!(
            "Added notification {} ({:?}: {})",
            notification.id,
            notification.kind,
            notification.title
        );
        self.commit(entries);
        notification
    }

    /// Snapshot of all notifications in insertion order
    pub fn get_notifications(&self) -> Vec<Notification> {
        self.entries().clone()
    }

    pub fn get_unread_count(&self) -> usize {
        self.entries().iter().filter(|n| !n.read).count()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Marks one notification read. Unknown ids are ignored.
    pub fn mark_as_read(&self, id: &str) {
        let mut entries = self.entries();
        if let Some(notification) = entries.iter_mut().find(|n| n.id == id) {
            notification.read = true;
        }
        self.commit(entries);
    }

    pub fn mark_all_as_read(&self) {
        let mut entries = self.entries();
        entries.iter_mut().for_each(|n| n.read = true);
        self.commit(entries);
    }

    /// Removes the notification with `id`, or every notification when `id` is `None`.
    pub fn clear_notifications(&self, id: Option<&str>) {
        let mut entries = self.entries();
        match id {
            Some(id) => entries.retain(|n| n.id != id),
            None => entries.clear(),
        }
        self.commit(entries);
    }

    pub fn get_canvas_notifications(&self, canvas_id: &str) -> Vec<Notification> {
        self.filtered(ContextKind::Canvas, canvas_id)
    }

    pub fn get_session_notifications(&self, session_id: &str) -> Vec<Notification> {
        self.filtered(ContextKind::Session, session_id)
    }

    /// Whether a notification with the same kind, text and context is already stored
    pub fn contains_similar(&self, new: &NewNotification) -> bool {
        self.entries().iter().any(|n| n.is_similar_to(new))
    }

    /// Registers `listener` for every future change of the list.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners().entries.len()
    }

    fn filtered(&self, kind: ContextKind, id: &str) -> Vec<Notification> {
        self.entries()
            .iter()
            .filter(|n| n.context_kind() == kind && n.context_id() == Some(id))
            .cloned()
            .collect()
    }

    /// Queues the applied state, releases the entries lock and delivers what is queued.
    fn commit(&self, entries: MutexGuard<'_, Vec<Notification>>) {
        self.fanout().pending.push_back(entries.clone());
        drop(entries);

        {
            let mut fanout = self.fanout();
            if fanout.delivering {
                return;
            }
            fanout.delivering = true;
        }

        loop {
            let snapshot = {
                let mut fanout = self.fanout();
                match fanout.pending.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        fanout.delivering = false;
                        return;
                    }
                }
            };
            self.notify(&snapshot);
        }
    }

    fn notify(&self, snapshot: &[Notification]) {
        let listeners: Vec<Listener> = self
            .listeners()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(snapshot);
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fanout(&self) -> MutexGuard<'_, Fanout> {
        self.fanout.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`NotificationStore::subscribe`]
#[must_use = "dropping the handle keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Removes the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.entries.len();
        listeners.entries.retain(|(id, _)| *id != self.id);
        listeners.entries.len() != before
    }
}
