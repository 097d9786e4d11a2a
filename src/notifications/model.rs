use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a notification, driving its presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CanvasUpdate,
    SessionDone,
    Error,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Canvas,
    Session,
    Global,
}

/// Where a notification originated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NotificationContext {
    Canvas(String),
    Session(String),
    Global,
}

impl NotificationContext {
    pub fn kind(&self) -> ContextKind {
        match self {
            Self::Canvas(_) => ContextKind::Canvas,
            Self::Session(_) => ContextKind::Session,
            Self::Global => ContextKind::Global,
        }
    }

    /// Canvas or session id; `None` for global notifications
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Canvas(id) | Self::Session(id) => Some(id),
            Self::Global => None,
        }
    }
}

/// A notification before the store has assigned identity and timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub context: NotificationContext,
    pub image_url: Option<String>,
}

impl NewNotification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            context: NotificationContext::Global,
            image_url: None,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title, message)
    }

    pub fn for_canvas(mut self, canvas_id: impl Into<String>) -> Self {
        self.context = NotificationContext::Canvas(canvas_id.into());
        self
    }

    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.context = NotificationContext::Session(session_id.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub context: NotificationContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Notification {
    pub(crate) fn create(new: NewNotification) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            read: false,
            kind: new.kind,
            title: new.title,
            message: new.message,
            context: new.context,
            image_url: new.image_url,
        }
    }

    pub fn context_kind(&self) -> ContextKind {
        self.context.kind()
    }

    pub fn context_id(&self) -> Option<&str> {
        self.context.id()
    }

    /// Same category, text and origin, ignoring identity and read state
    pub fn is_similar_to(&self, other: &NewNotification) -> bool {
        self.kind == other.kind
            && self.title == other.title
            && self.message == other.message
            && self.context == other.context
    }
}
