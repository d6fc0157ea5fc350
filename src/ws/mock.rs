//! In-memory transport and recording handler for unit tests.

#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use super::config::Config;
use super::connection::{ConnectionHandle, ConnectionState};
use super::error::WsError;
use super::event::{Event, EventHandler, EventKind, HandlerResult};
use super::frame::{Frame, OpCode};
use super::transport::Transport;

type Inbound = Result<Frame, WsError>;

/// A frame the code under test sent to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(String),
    Ping(Bytes),
    Pong(Bytes),
    Close,
}

/// Transport fed from a channel. Dropping the sender reads as a lost connection.
pub(crate) struct MockTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
    sent: Mutex<Vec<Sent>>,
    connected: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedSender<Inbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            inbound: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        };
        (Arc::new(transport), tx)
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    fn record(&self, sent: Sent) -> Result<(), WsError> {
        if !self.is_connected() {
            return Err(WsError::ConnectionLost);
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&self) -> Result<Frame, WsError> {
        let next = self.inbound.lock().await.recv().await;
        match next {
            Some(Ok(frame)) => {
                if frame.opcode == OpCode::Close {
                    self.disconnect();
                }
                Ok(frame)
            }
            Some(Err(e)) => Err(e),
            None => {
                self.disconnect();
                Err(WsError::ConnectionLost)
            }
        }
    }

    async fn send_text(&self, text: String) -> Result<(), WsError> {
        self.record(Sent::Text(text))
    }

    async fn send_ping(&self, payload: Bytes) -> Result<(), WsError> {
        self.record(Sent::Ping(payload))
    }

    async fn send_pong(&self, payload: Bytes) -> Result<(), WsError> {
        self.record(Sent::Pong(payload))
    }

    async fn send_close(&self) -> Result<(), WsError> {
        self.record(Sent::Close)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

pub(crate) fn config() -> Config {
    Config::builder().base_url("wss://feed.example/ws").build()
}

/// An open handle over `transport` with the default test config.
pub(crate) fn handle_for(transport: &Arc<MockTransport>) -> ConnectionHandle {
    handle_with(transport, config())
}

pub(crate) fn handle_with(transport: &Arc<MockTransport>, config: Config) -> ConnectionHandle {
    let url = config.url().unwrap();
    let (state_tx, _) = watch::channel(ConnectionState::Open {
        since: std::time::Instant::now(),
    });
    ConnectionHandle::new(
        config,
        url,
        Arc::clone(transport) as Arc<dyn Transport>,
        state_tx,
    )
}

/// Records every event it sees as a short string, optionally failing or panicking on
/// selected kinds after recording.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
    failing: HashSet<EventKind>,
    panicking: HashSet<EventKind>,
}

impl Recorder {
    pub(crate) fn failing(mut self, kind: EventKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub(crate) fn panicking(mut self, kind: EventKind) -> Self {
        self.panicking.insert(kind);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for Recorder {
    async fn handle(&self, _connection: &ConnectionHandle, event: Event) -> HandlerResult {
        let kind = event.kind();
        let call = match &event {
            Event::Message(text) => format!("message:{text}"),
            Event::Ping(payload) => format!("ping:{}", String::from_utf8_lossy(payload)),
            Event::Error(fault) => format!("error:{fault}"),
            _ => kind.to_string(),
        };
        self.calls.lock().unwrap().push(call);

        assert!(!self.panicking.contains(&kind), "{kind} handler panicked");
        if self.failing.contains(&kind) {
            return Err(format!("{kind} handler rejected event").into());
        }
        Ok(())
    }
}
