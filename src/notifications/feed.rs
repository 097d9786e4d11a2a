use super::model::{NewNotification, Notification, NotificationContext, NotificationKind};
use super::store::NotificationStore;
use crate::messaging::{SessionEvent, SessionUpdate};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Turns session updates into user-facing notifications.
#[derive(Clone)]
pub struct NotificationFeed {
    store: NotificationStore,
    current_canvas: Arc<RwLock<Option<String>>>,
}

impl NotificationFeed {
    pub fn new(store: NotificationStore) -> Self {
        Self {
            store,
            current_canvas: Arc::new(RwLock::new(None)),
        }
    }

    /// Canvas the user is looking at. Updates for it are not notified.
    pub fn set_current_canvas(&self, canvas_id: Option<String>) {
        *self
            .current_canvas
            .write()
            .unwrap_or_else(PoisonError::into_inner) = canvas_id;
    }

    pub fn current_canvas(&self) -> Option<String> {
        self.current_canvas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    /// Adds the notification for `update`, if it warrants one.
    pub fn handle(&self, update: &SessionUpdate) -> Option<Notification> {
        let new = notification_for(update)?;

        if let NotificationContext::Canvas(canvas_id) = &new.context
            && self.current_canvas().as_deref() == Some(canvas_id.as_str())
        {
            tracing::debug!("Skipping notification for current canvas {}", canvas_id);
            return None;
        }
        if self.store.contains_similar(&new) {
            tracing::debug!("Skipping duplicate notification: {}", new.title);
            return None;
        }

        Some(self.store.add(new))
    }

    /// Consumes `updates` until the sender side is gone.
    pub fn spawn(self, mut updates: broadcast::Receiver<SessionUpdate>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => {
                        self.handle(&update);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Notification feed lagged, skipped {} updates", skipped);
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Session update stream closed");
                        break;
                    }
                }
            }
        })
    }
}

fn notification_for(update: &SessionUpdate) -> Option<NewNotification> {
    let new = match &update.event {
        SessionEvent::ImageGenerated {
            canvas_id,
            image_url,
            ..
        } => NewNotification::new(
            NotificationKind::CanvasUpdate,
            "Image generated",
            "Image added to canvas",
        )
        .for_canvas(canvas_id.as_str())
        .with_image_url(image_url.as_str()),
        SessionEvent::VideoGenerated {
            canvas_id,
            video_url,
            ..
        } => NewNotification::new(
            NotificationKind::CanvasUpdate,
            "Video generated",
            "Video added to canvas",
        )
        .for_canvas(canvas_id.as_str())
        .with_image_url(video_url.as_str()),
        SessionEvent::Info { info } => {
            NewNotification::info("Info", info.as_str()).for_session(update.session_id.as_str())
        }
        SessionEvent::Done => NewNotification::new(
            NotificationKind::SessionDone,
            "Session complete",
            "The agent finished responding",
        )
        .for_session(update.session_id.as_str()),
        SessionEvent::Error { error } => {
            NewNotification::new(NotificationKind::Error, "Error", error.as_str())
                .for_session(update.session_id.as_str())
        }
        _ => return None,
    };
    Some(new)
}
