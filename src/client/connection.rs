use serde::Serialize;

/// Connection lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

/// Snapshot of the manager's connectivity, published on every transition.
///
/// `connection_id` is `Some` exactly when `status` is [`ConnectionStatus::Connected`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub connection_id: Option<String>,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    pub last_error: Option<String>,
}

impl ConnectionState {
    pub fn disconnected(max_reconnect_attempts: u32) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            connection_id: None,
            reconnect_attempts: 0,
            max_reconnect_attempts,
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.status == ConnectionStatus::Connecting
    }

    pub fn is_max_reconnect_attempts_reached(&self) -> bool {
        self.reconnect_attempts >= self.max_reconnect_attempts
    }
}
