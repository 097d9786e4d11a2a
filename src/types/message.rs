use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named Socket.IO event with its JSON payload, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMessage {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl EventMessage {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Builds a message from Socket.IO event arguments.
    ///
    /// A single argument becomes the payload as-is, no arguments become `null`, and
    /// several arguments are kept together as an array.
    pub fn from_args(event: impl Into<String>, mut args: Vec<Value>) -> Self {
        let payload = match args.len() {
            0 => Value::Null,
            1 => args.remove(0),
            _ => Value::Array(args),
        };
        Self::new(event, payload)
    }
}
