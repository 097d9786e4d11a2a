use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `session_update` pushed by the server for a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub session_id: String,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Type-safe session update payloads, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Error {
        error: String,
    },
    Done,
    Info {
        info: String,
    },
    ImageGenerated {
        canvas_id: String,
        image_url: String,
        #[serde(default)]
        element: Value,
        #[serde(default)]
        file: Value,
    },
    VideoGenerated {
        canvas_id: String,
        video_url: String,
        #[serde(default)]
        element: Value,
        #[serde(default)]
        file: Value,
    },
    Delta {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
    },
    ToolCallArguments {
        id: String,
        text: String,
    },
    ToolCallResult {
        id: String,
        message: Value,
    },
    AllMessages {
        messages: Vec<Value>,
    },
    ToolCallProgress {
        tool_call_id: String,
        update: String,
    },
    ToolCallPendingConfirmation {
        id: String,
        name: String,
        arguments: String,
    },
    ToolCallConfirmed {
        id: String,
    },
    ToolCallCancelled {
        id: String,
    },
}

impl SessionEvent {
    /// Wire name of the update type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Done => "done",
            Self::Info { .. } => "info",
            Self::ImageGenerated { .. } => "image_generated",
            Self::VideoGenerated { .. } => "video_generated",
            Self::Delta { .. } => "delta",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolCallArguments { .. } => "tool_call_arguments",
            Self::ToolCallResult { .. } => "tool_call_result",
            Self::AllMessages { .. } => "all_messages",
            Self::ToolCallProgress { .. } => "tool_call_progress",
            Self::ToolCallPendingConfirmation { .. } => "tool_call_pending_confirmation",
            Self::ToolCallConfirmed { .. } => "tool_call_confirmed",
            Self::ToolCallCancelled { .. } => "tool_call_cancelled",
        }
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a `session_update` payload was not turned into a [`SessionUpdate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    MissingSessionId,
    UnknownType(String),
    Malformed(String),
}

impl SessionUpdate {
    pub fn parse(payload: &Value) -> Result<Self, Rejected> {
        let session_id = payload
            .get("session_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if session_id.is_empty() {
            return Err(Rejected::MissingSessionId);
        }

        let event = serde_json::from_value::<SessionEvent>(payload.clone()).map_err(|e| {
            match payload.get("type").and_then(Value::as_str) {
                Some(kind) if !is_known_type(kind) => Rejected::UnknownType(kind.to_string()),
                _ => Rejected::Malformed(e.to_string()),
            }
        })?;

        Ok(Self {
            session_id: session_id.to_string(),
            event,
        })
    }
}

fn is_known_type(kind: &str) -> bool {
    matches!(
        kind,
        "error"
            | "done"
            | "info"
            | "image_generated"
            | "video_generated"
            | "delta"
            | "tool_call"
            | "tool_call_arguments"
            | "tool_call_result"
            | "all_messages"
            | "tool_call_progress"
            | "tool_call_pending_confirmation"
            | "tool_call_confirmed"
            | "tool_call_cancelled"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_image_generated() {
        let update = SessionUpdate::parse(&json!({
            "session_id": "s1",
            "type": "image_generated",
            "canvas_id": "c1",
            "image_url": "/api/file/img.png",
            "element": {"id": "el"},
            "file": {"id": "f"}
        }))
        .unwrap();

        assert_eq!(update.session_id, "s1");
        let SessionEvent::ImageGenerated {
            canvas_id,
            image_url,
            ..
        } = update.event
        else {
            panic!("expected image_generated");
        };
        assert_eq!(canvas_id, "c1");
        assert_eq!(image_url, "/api/file/img.png");
    }

    #[test]
    fn test_parse_done_without_fields() {
        let update = SessionUpdate::parse(&json!({"session_id": "s1", "type": "done"})).unwrap();
        assert_eq!(update.event, SessionEvent::Done);
    }

    #[test]
    fn test_parse_rejects_missing_session_id() {
        let rejected = SessionUpdate::parse(&json!({"type": "info", "info": "hi"})).unwrap_err();
        assert_eq!(rejected, Rejected::MissingSessionId);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let rejected =
            SessionUpdate::parse(&json!({"session_id": "s1", "type": "teleport"})).unwrap_err();
        assert_eq!(rejected, Rejected::UnknownType("teleport".to_string()));
    }

    #[test]
    fn test_parse_rejects_known_type_with_missing_fields() {
        let rejected =
            SessionUpdate::parse(&json!({"session_id": "s1", "type": "delta"})).unwrap_err();
        assert!(matches!(rejected, Rejected::Malformed(_)));
    }

    #[test]
    fn test_wire_names_match_serde_tags() {
        let event = SessionEvent::ToolCallPendingConfirmation {
            id: "t1".to_string(),
            name: "generate_image".to_string(),
            arguments: "{}".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.as_str());
    }
}
