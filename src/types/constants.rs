/// Server event names the client knows about (magic strings layer)
pub mod server_events {
    pub const CONNECTED: &str = "connected";
    pub const INIT_DONE: &str = "init_done";
    pub const SESSION_UPDATE: &str = "session_update";
    pub const PONG: &str = "pong";
}

/// Client event names
pub mod client_events {
    pub const PING: &str = "ping";
}

/// Engine.IO protocol revision spoken by the transport
pub const ENGINE_IO_VERSION: &str = "4";

/// WebSocket transport
pub const TRANSPORT_WEBSOCKET: &str = "websocket";

/// Default Socket.IO mount path
pub const DEFAULT_PATH: &str = "/socket.io/";

/// Default Socket.IO namespace
pub const DEFAULT_NAMESPACE: &str = "/";

/// Default connect timeout (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 20_000;

/// Default number of consecutive failures before automatic retries stop
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default reconnect intervals (milliseconds)
pub const RECONNECT_INTERVALS: [u64; 4] = [1000, 2000, 4000, 5000];

/// Buffer size for inbound transport events
pub const INBOUND_BUFFER_SIZE: usize = 256;

/// Buffer size for connectivity and session broadcast channels
pub const BROADCAST_BUFFER_SIZE: usize = 64;

/// Notifications kept by the application-level store
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 50;
