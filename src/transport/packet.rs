//! Engine.IO v4 and Socket.IO v5 text packet framing.
//!
//! An Engine.IO packet is a single type digit followed by its data. Socket.IO packets
//! travel inside Engine.IO `message` packets (`4`) and carry their own type digit,
//! an optional namespace terminated by `,`, an optional ack id and a JSON body.
//! Binary attachments are not supported.

use crate::types::{DEFAULT_NAMESPACE, EventMessage, Result, SocketError};
use serde::Deserialize;
use serde_json::Value;

/// Engine.IO handshake data sent by the server in the `open` packet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        message: EventMessage,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        data: Value,
    },
    ConnectError {
        namespace: String,
        data: Value,
    },
}

impl SocketPacket {
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Human-readable reason from a `connect_error` body
    pub fn connect_error_message(data: &Value) -> String {
        data.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string())
    }
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SocketError::Protocol("empty packet".to_string()))?;
        let body = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(body)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(body.to_string())),
            '3' => Ok(Self::Pong(body.to_string())),
            '4' => Ok(Self::Message(SocketPacket::decode(body)?)),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(SocketError::Protocol(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Self::Open(_) => {
                return Err(SocketError::Protocol(
                    "open packets are only sent by the server".to_string(),
                ));
            }
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{}", data),
            Self::Pong(data) => format!("3{}", data),
            Self::Message(packet) => format!("4{}", packet.encode()?),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        })
    }
}

impl SocketPacket {
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| SocketError::Protocol("empty socket packet".to_string()))?;
        let rest = chars.as_str();

        let (namespace, rest) = split_namespace(rest);
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let (ack_digits, body) = rest.split_at(digits);
        let ack_id = if ack_digits.is_empty() {
            None
        } else {
            Some(
                ack_digits
                    .parse::<u64>()
                    .map_err(|e| SocketError::Protocol(format!("bad ack id: {}", e)))?,
            )
        };

        let data = if body.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(body)?)
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let Some(Value::Array(mut args)) = data else {
                    return Err(SocketError::Protocol(
                        "event packet body must be an array".to_string(),
                    ));
                };
                if args.is_empty() {
                    return Err(SocketError::Protocol("event packet without name".to_string()));
                }
                let Value::String(name) = args.remove(0) else {
                    return Err(SocketError::Protocol(
                        "event name must be a string".to_string(),
                    ));
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    message: EventMessage::from_args(name, args),
                })
            }
            '3' => {
                let ack_id = ack_id
                    .ok_or_else(|| SocketError::Protocol("ack packet without id".to_string()))?;
                Ok(Self::Ack {
                    namespace,
                    ack_id,
                    data: data.unwrap_or(Value::Null),
                })
            }
            '4' => Ok(Self::ConnectError {
                namespace,
                data: data.unwrap_or(Value::Null),
            }),
            '5' | '6' => Err(SocketError::Protocol(
                "binary packets are not supported".to_string(),
            )),
            other => Err(SocketError::Protocol(format!(
                "unknown socket packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> Result<String> {
        let (kind, namespace, ack_id, body) = match self {
            Self::Connect { namespace, data } => (
                '0',
                namespace,
                None,
                data.as_ref().map(serde_json::to_string).transpose()?,
            ),
            Self::Disconnect { namespace } => ('1', namespace, None, None),
            Self::Event {
                namespace,
                ack_id,
                message,
            } => {
                let args = Value::Array(vec![
                    Value::String(message.event.clone()),
                    message.payload.clone(),
                ]);
                ('2', namespace, *ack_id, Some(serde_json::to_string(&args)?))
            }
            Self::Ack {
                namespace,
                ack_id,
                data,
            } => ('3', namespace, Some(*ack_id), Some(serde_json::to_string(data)?)),
            Self::ConnectError { namespace, data } => {
                ('4', namespace, None, Some(serde_json::to_string(data)?))
            }
        };

        let mut out = String::new();
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(body) = body {
            out.push_str(&body);
        }
        Ok(out)
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if rest.starts_with('/')
        && let Some(comma) = rest.find(',')
    {
        return (rest[..comma].to_string(), &rest[comma + 1..]);
    }
    if rest.starts_with('/') {
        // Namespace without body, e.g. "1/admin"
        return (rest.to_string(), "");
    }
    (DEFAULT_NAMESPACE.to_string(), rest)
}
