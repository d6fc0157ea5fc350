//! Events raised by a connection and the handlers that consume them.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::connection::ConnectionHandle;
use super::error::{BoxError, HandlerFault};

/// Outcome of handling a single event.
pub type HandlerResult = Result<(), BoxError>;

/// The closed set of events a connection raises.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Open,
    Message,
    Ping,
    Pong,
    Close,
    Error,
}

/// An event together with its payload.
#[non_exhaustive]
#[derive(Debug)]
pub enum Event {
    /// The handshake completed
    Open,
    /// A TEXT frame arrived, decoded as UTF-8
    Message(String),
    /// A PING frame arrived with the given payload
    Ping(Bytes),
    /// A PONG frame arrived
    Pong,
    /// The peer sent a CLOSE frame
    Close,
    /// Another handler faulted
    Error(HandlerFault),
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Message(_) => EventKind::Message,
            Self::Ping(_) => EventKind::Ping,
            Self::Pong => EventKind::Pong,
            Self::Close => EventKind::Close,
            Self::Error(_) => EventKind::Error,
        }
    }
}

/// Single entry point through which a connection delivers its events.
///
/// Implementations may fail or even panic: the dispatcher contains both, logs them and reports
/// them back through [`Event::Error`].
///
/// # Example
///
/// ```ignore
/// struct Printer;
///
/// #[async_trait]
/// impl EventHandler for Printer {
///     async fn handle(&self, _: &ConnectionHandle, event: Event) -> HandlerResult {
///         if let Event::Message(text) = event {
///             tracing::info!(%text, "update");
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, connection: &ConnectionHandle, event: Event) -> HandlerResult;
}

type Callback = Box<dyn Fn(&ConnectionHandle) -> HandlerResult + Send + Sync>;
type MessageCallback = Box<dyn Fn(&ConnectionHandle, String) -> HandlerResult + Send + Sync>;
type PingCallback = Box<dyn Fn(&ConnectionHandle, Bytes) -> HandlerResult + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&ConnectionHandle, HandlerFault) -> HandlerResult + Send + Sync>;

/// A set of optional per-event callbacks.
///
/// Events without a registered callback are ignored. The set cannot be changed once it is
/// handed to a [`ConnectionManager`](super::ConnectionManager).
///
/// ```ignore
/// let callbacks = Callbacks::new()
///     .on_message(|_, text| {
///         tracing::info!(%text, "update");
///         Ok(())
///     })
///     .on_error(|_, fault| {
///         tracing::warn!(%fault, "handler failed");
///         Ok(())
///     });
/// ```
#[derive(Default)]
pub struct Callbacks {
    on_open: Option<Callback>,
    on_message: Option<MessageCallback>,
    on_close: Option<Callback>,
    on_error: Option<ErrorCallback>,
    on_ping: Option<PingCallback>,
    on_pong: Option<Callback>,
}

impl Callbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionHandle) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_open = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionHandle, String) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_message = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionHandle) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_close = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionHandle, HandlerFault) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_ping<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionHandle, Bytes) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_ping = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_pong<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionHandle) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_pong = Some(Box::new(f));
        self
    }

    /// Whether a callback is registered for `kind`.
    #[must_use]
    pub fn is_registered(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Open => self.on_open.is_some(),
            EventKind::Message => self.on_message.is_some(),
            EventKind::Ping => self.on_ping.is_some(),
            EventKind::Pong => self.on_pong.is_some(),
            EventKind::Close => self.on_close.is_some(),
            EventKind::Error => self.on_error.is_some(),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_ping", &self.on_ping.is_some())
            .field("on_pong", &self.on_pong.is_some())
            .finish()
    }
}

#[async_trait]
impl EventHandler for Callbacks {
    async fn handle(&self, connection: &ConnectionHandle, event: Event) -> HandlerResult {
        match event {
            Event::Open => self.on_open.as_ref().map_or(Ok(()), |f| f(connection)),
            Event::Message(text) => self
                .on_message
                .as_ref()
                .map_or(Ok(()), |f| f(connection, text)),
            Event::Ping(payload) => self
                .on_ping
                .as_ref()
                .map_or(Ok(()), |f| f(connection, payload)),
            Event::Pong => self.on_pong.as_ref().map_or(Ok(()), |f| f(connection)),
            Event::Close => self.on_close.as_ref().map_or(Ok(()), |f| f(connection)),
            Event::Error(fault) => self
                .on_error
                .as_ref()
                .map_or(Ok(()), |f| f(connection, fault)),
        }
    }
}

/// Forwards every event into a bounded channel.
///
/// A full channel holds the reader back until the consumer catches up. Once the receiver is
/// dropped every delivery fails, which surfaces as a handler fault.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    sender: mpsc::Sender<Event>,
}

impl ChannelHandler {
    /// Create a handler and the receiving end of its channel.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventHandler for ChannelHandler {
    async fn handle(&self, _connection: &ConnectionHandle, event: Event) -> HandlerResult {
        let kind = event.kind();
        self.sender
            .send(event)
            .await
            .map_err(|_e| format!("receiver dropped before {kind} event was delivered"))?;
        Ok(())
    }
}
