use super::{ConnectionState, ManagerState, SocketManager};
use crate::infrastructure::Backoff;
use crate::messaging::{EventRegistry, EventRouter};
use crate::transport::{SocketIoTransport, Transport};
use crate::types::{
    BROADCAST_BUFFER_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_NAMESPACE, DEFAULT_PATH, RECONNECT_INTERVALS, Result, SocketError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};
use url::Url;

#[derive(Debug, Clone)]
pub struct SocketManagerOptions {
    /// Connect as soon as the manager is built. Default: `false`.
    pub auto_connect: bool,
    /// Consecutive failures after which automatic retries stop. Default: 5.
    pub max_reconnect_attempts: u32,
    /// Retry delays in milliseconds, indexed by attempt; must not decrease.
    pub reconnect_intervals: Vec<u64>,
    /// Handshake timeout in milliseconds. Default: 20000.
    pub connect_timeout: Option<u64>,
    /// Socket.IO mount path. Default: `/socket.io/`.
    pub path: String,
    /// Socket.IO namespace. Default: `/`.
    pub namespace: String,
}

impl Default for SocketManagerOptions {
    fn default() -> Self {
        Self {
            auto_connect: false,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_intervals: RECONNECT_INTERVALS.to_vec(),
            connect_timeout: None,
            path: DEFAULT_PATH.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl SocketManagerOptions {
    /// Defaults overlaid with `JAAZ_*` environment variables.
    ///
    /// Reads `JAAZ_AUTO_CONNECT`, `JAAZ_MAX_RECONNECT_ATTEMPTS`,
    /// `JAAZ_RECONNECT_INTERVALS` (comma-separated milliseconds) and
    /// `JAAZ_CONNECT_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(value) = lookup("JAAZ_AUTO_CONNECT") {
            options.auto_connect = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(SocketError::InvalidConfig(format!(
                        "JAAZ_AUTO_CONNECT must be a boolean, got '{}'",
                        other
                    )));
                }
            };
        }
        if let Some(value) = lookup("JAAZ_MAX_RECONNECT_ATTEMPTS") {
            options.max_reconnect_attempts = parse_number("JAAZ_MAX_RECONNECT_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("JAAZ_RECONNECT_INTERVALS") {
            options.reconnect_intervals = value
                .split(',')
                .map(|part| parse_number("JAAZ_RECONNECT_INTERVALS", part))
                .collect::<Result<Vec<u64>>>()?;
        }
        if let Some(value) = lookup("JAAZ_CONNECT_TIMEOUT_MS") {
            options.connect_timeout = Some(parse_number("JAAZ_CONNECT_TIMEOUT_MS", &value)?);
        }

        Ok(options)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        SocketError::InvalidConfig(format!("{} has invalid value '{}': {}", key, value, e))
    })
}

/// Builder for SocketManager that handles validation and initialization
pub struct SocketManagerBuilder {
    endpoint: Url,
    options: SocketManagerOptions,
    backoff: Backoff,
    transport: Option<Arc<dyn Transport>>,
}

impl SocketManagerBuilder {
    /// Create a new builder
    pub fn new(server_url: impl AsRef<str>, options: SocketManagerOptions) -> Result<Self> {
        let endpoint = Url::parse(server_url.as_ref())?;
        if !matches!(endpoint.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(SocketError::InvalidConfig(format!(
                "server URL must use http, https, ws or wss, got '{}'",
                endpoint.scheme()
            )));
        }
        if !options.path.starts_with('/') {
            return Err(SocketError::InvalidConfig(format!(
                "path must start with '/', got '{}'",
                options.path
            )));
        }
        if !options.namespace.starts_with('/') {
            return Err(SocketError::InvalidConfig(format!(
                "namespace must start with '/', got '{}'",
                options.namespace
            )));
        }
        let backoff = Backoff::new(options.reconnect_intervals.clone())?;

        Ok(Self {
            endpoint,
            options,
            backoff,
            transport: None,
        })
    }

    /// Replace the Socket.IO transport, e.g. with an in-memory one
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the manager.
    ///
    /// With `auto_connect` this spawns the first attempt and must be called inside a
    /// tokio runtime.
    pub fn build(self) -> SocketManager {
        let max = self.options.max_reconnect_attempts;
        let (state_tx, state_rx) = watch::channel(ConnectionState::disconnected(max));
        let (transitions_tx, _) = broadcast::channel(BROADCAST_BUFFER_SIZE);
        let (sessions_tx, _) = broadcast::channel(BROADCAST_BUFFER_SIZE);

        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(SocketIoTransport::new(
                self.options.path.clone(),
                self.options.namespace.clone(),
                self.options.connect_timeout(),
            ))
        });

        let registry = Arc::new(EventRegistry::new());
        let router = EventRouter::new(Arc::clone(&registry), sessions_tx.clone());
        let auto_connect = self.options.auto_connect;

        let manager = SocketManager {
            endpoint: self.endpoint,
            options: self.options,
            backoff: self.backoff,
            transport,
            registry,
            router,
            sessions: sessions_tx,
            transitions: transitions_tx.clone(),
            state_rx,
            state: Arc::new(RwLock::new(ManagerState::new(max, state_tx, transitions_tx))),
        };

        if auto_connect {
            let manager_for_connect = manager.clone();
            tokio::spawn(async move {
                manager_for_connect.connect().await;
            });
        }

        manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = SocketManagerOptions::default();
        assert!(!options.auto_connect);
        assert_eq!(options.max_reconnect_attempts, 5);
        assert_eq!(options.connect_timeout(), Duration::from_secs(20));
        assert_eq!(options.path, "/socket.io/");
    }

    #[test]
    fn test_env_overlay() {
        let options = SocketManagerOptions::from_lookup(lookup(&[
            ("JAAZ_AUTO_CONNECT", "true"),
            ("JAAZ_MAX_RECONNECT_ATTEMPTS", "3"),
            ("JAAZ_RECONNECT_INTERVALS", "500, 1000,1000"),
            ("JAAZ_CONNECT_TIMEOUT_MS", "7000"),
        ]))
        .unwrap();

        assert!(options.auto_connect);
        assert_eq!(options.max_reconnect_attempts, 3);
        assert_eq!(options.reconnect_intervals, vec![500, 1000, 1000]);
        assert_eq!(options.connect_timeout(), Duration::from_millis(7000));
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = SocketManagerOptions::from_lookup(lookup(&[(
            "JAAZ_MAX_RECONNECT_ATTEMPTS",
            "lots",
        )]))
        .unwrap_err();
        assert!(matches!(err, SocketError::InvalidConfig(_)));
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        assert!(matches!(
            SocketManagerBuilder::new("not a url", SocketManagerOptions::default()),
            Err(SocketError::UrlParse(_))
        ));
        assert!(matches!(
            SocketManagerBuilder::new("file:///tmp/socket", SocketManagerOptions::default()),
            Err(SocketError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_rejects_decreasing_intervals() {
        let options = SocketManagerOptions {
            reconnect_intervals: vec![5000, 1000],
            ..Default::default()
        };
        assert!(matches!(
            SocketManagerBuilder::new("http://localhost:57988", options),
            Err(SocketError::InvalidConfig(_))
        ));
    }
}
