//! Scripted in-memory transport used by the manager tests.

use super::{Transport, TransportEvent, TransportLink, TransportSink};
use crate::types::{EventMessage, Result, SocketError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Accept(String),
    Refuse(String),
}

/// Server side of an accepted fake link
pub(crate) struct FakeServer {
    pub connection_id: String,
    events: mpsc::Sender<TransportEvent>,
    pub emitted: Arc<Mutex<Vec<EventMessage>>>,
    pub closed: Arc<Mutex<bool>>,
}

impl FakeServer {
    pub async fn push(&self, event: &str, payload: serde_json::Value) {
        let _ = self
            .events
            .send(TransportEvent::Message(EventMessage::new(event, payload)))
            .await;
    }

    pub async fn drop_link(&self, reason: &str) {
        let _ = self
            .events
            .send(TransportEvent::Closed(reason.to_string()))
            .await;
    }

    pub fn emitted(&self) -> Vec<EventMessage> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[derive(Default)]
struct Script {
    outcomes: VecDeque<Outcome>,
    fallback: Option<Outcome>,
    servers: Vec<Arc<FakeServer>>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    script: Arc<Mutex<Script>>,
    opens: Arc<AtomicUsize>,
    open_delay: Option<Duration>,
}

impl FakeTransport {
    /// Every open is refused
    pub fn refusing() -> Self {
        let transport = Self::default();
        transport.script.lock().unwrap().fallback =
            Some(Outcome::Refuse("connection refused".to_string()));
        transport
    }

    /// Every open succeeds with ids `sid-1`, `sid-2`, ...
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Outcomes consumed in order before falling back to the default behaviour
    pub fn scripted(outcomes: Vec<Outcome>) -> Self {
        let transport = Self::default();
        transport.script.lock().unwrap().outcomes = outcomes.into();
        transport
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn server(&self, index: usize) -> Arc<FakeServer> {
        Arc::clone(&self.script.lock().unwrap().servers[index])
    }

    pub fn last_server(&self) -> Arc<FakeServer> {
        let script = self.script.lock().unwrap();
        Arc::clone(script.servers.last().expect("no link was accepted"))
    }
}

struct FakeSink {
    emitted: Arc<Mutex<Vec<EventMessage>>>,
    closed: Arc<Mutex<bool>>,
}

#[async_trait]
impl TransportSink for FakeSink {
    async fn emit(&self, message: EventMessage) -> Result<()> {
        if *self.closed.lock().unwrap() {
            return Err(SocketError::NotConnected);
        }
        self.emitted.lock().unwrap().push(message);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, _endpoint: &Url) -> Result<TransportLink> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let mut script = self.script.lock().unwrap();
            script
                .outcomes
                .pop_front()
                .or_else(|| script.fallback.clone())
                .unwrap_or_else(|| Outcome::Accept(format!("sid-{}", attempt)))
        };

        match outcome {
            Outcome::Refuse(reason) => Err(SocketError::Connection(reason)),
            Outcome::Accept(connection_id) => {
                let (tx, rx) = mpsc::channel(16);
                let emitted = Arc::new(Mutex::new(Vec::new()));
                let closed = Arc::new(Mutex::new(false));
                let server = Arc::new(FakeServer {
                    connection_id: connection_id.clone(),
                    events: tx,
                    emitted: Arc::clone(&emitted),
                    closed: Arc::clone(&closed),
                });
                self.script.lock().unwrap().servers.push(server);
                Ok(TransportLink {
                    connection_id,
                    sink: Box::new(FakeSink { emitted, closed }),
                    events: rx,
                })
            }
        }
    }
}
