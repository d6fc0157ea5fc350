#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, Span};
use url::Url;

use super::config::Config;
use super::dispatcher::CallbackDispatcher;
use super::event::{Event, EventHandler};
use super::reader::FrameReader;
use super::transport::{Transport, TungsteniteTransport};
use crate::Result;
use crate::error::{Error, Kind};

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Handshake completed
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// A CLOSE frame was sent and the peer's reply has not been read yet
    Closing,
    /// CLOSE received, transport fault, or reader cancelled
    Closed,
}

impl ConnectionState {
    /// Check if the connection is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Cheaply cloneable handle to an open connection.
///
/// Handed to every event handler and safe to use from any task while the reader is running.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    config: Config,
    url: Url,
    span: Span,
    transport: Arc<dyn Transport>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        mut config: Config,
        url: Url,
        transport: Arc<dyn Transport>,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        let span = config.span();
        Self {
            inner: Arc::new(HandleInner {
                config,
                url,
                span,
                transport,
                state_tx,
            }),
        }
    }

    /// Forward `message` to the transport as a TEXT frame, verbatim.
    pub async fn send_message<S: Into<String>>(&self, message: S) -> Result<()> {
        self.inner.transport.send_text(message.into()).await?;
        Ok(())
    }

    /// Serialize `request` to JSON and send it as a TEXT frame.
    pub async fn send_json<R: Serialize>(&self, request: &R) -> Result<()> {
        let json = serde_json::to_string(request)?;
        self.send_message(json).await
    }

    /// Send an empty PING frame.
    pub async fn ping(&self) -> Result<()> {
        self.inner.transport.send_ping(Bytes::new()).await?;
        Ok(())
    }

    /// Request a graceful shutdown by sending a CLOSE frame.
    ///
    /// Returns as soon as the frame is sent; the reader observes the peer's reply. On a
    /// connection that is not open this logs a warning and sends nothing.
    pub async fn close(&self) -> Result<()> {
        let requested = self.inner.transport.is_connected()
            && self.inner.state_tx.send_if_modified(|state| {
                if state.is_open() {
                    *state = ConnectionState::Closing;
                    true
                } else {
                    false
                }
            });

        if !requested {
            tracing::warn!(state = ?self.state(), "Websocket already closed");
            return Ok(());
        }

        tracing::debug!("Sending CLOSE frame");
        self.inner.transport.send_close().await?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether the connection is open and the transport still live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_open() && self.inner.transport.is_connected()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.url
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.config.timeout
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.inner.state_tx.send_replace(state);
    }

    pub(crate) fn span(&self) -> Span {
        self.inner.span.clone()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("base_url", &self.inner.url.as_str())
            .field("timeout", &self.inner.config.timeout)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Opens a feed connection and starts its reader.
///
/// Opening performs the handshake and delivers [`Event::Open`] before returning. The reader is
/// started separately with [`ConnectionManager::start`], which consumes the manager so each
/// connection has exactly one reader.
///
/// # Example
///
/// ```rust, no_run
/// use feed_socket::ws::{Callbacks, Config, ConnectionManager};
///
/// # async fn example() -> feed_socket::Result<()> {
/// let config = Config::builder().base_url("wss://feed.example/ws").build();
/// let callbacks = Callbacks::new().on_message(|_, text| {
///     tracing::info!(%text, "update");
///     Ok(())
/// });
///
/// let connection = ConnectionManager::open(config, callbacks).await?;
/// let handle = connection.handle();
/// let reader = connection.start();
///
/// handle.send_message(r#"{"action":"subscribe","pair":"eth_usdt"}"#).await?;
/// reader.join().await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager {
    handle: ConnectionHandle,
    dispatcher: CallbackDispatcher,
}

impl ConnectionManager {
    /// Connect to [`Config::base_url`] over `tokio-tungstenite`.
    ///
    /// Fails with [`Kind::Validation`] for a malformed URL and [`Kind::Connection`] if the
    /// handshake cannot complete. There is no retry.
    pub async fn open<H: EventHandler>(mut config: Config, handler: H) -> Result<Self> {
        let url = config.url()?;
        let span = config.span();

        let transport = TungsteniteTransport::connect(&url, config.timeout)
            .instrument(span.clone())
            .await
            .inspect_err(|e| {
                span.in_scope(|| tracing::error!(error = %e, "Unable to connect"));
            })?;

        Self::with_transport(config, Arc::new(transport), handler).await
    }

    /// Wrap an already connected transport.
    pub async fn with_transport<T: Transport, H: EventHandler>(
        config: Config,
        transport: Arc<T>,
        handler: H,
    ) -> Result<Self> {
        let url = config.url()?;
        if !transport.is_connected() {
            return Err(Error::validation("transport is not connected"));
        }

        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let handle = ConnectionHandle::new(config, url, transport, state_tx);
        let dispatcher = CallbackDispatcher::new(Arc::new(handler));

        handle.set_state(ConnectionState::Open {
            since: Instant::now(),
        });
        let span = handle.span();
        span.in_scope(|| tracing::debug!("Connection open"));
        dispatcher
            .dispatch(&handle, Event::Open)
            .instrument(span)
            .await;

        Ok(Self { handle, dispatcher })
    }

    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Spawn the reader on its own task.
    #[must_use = "dropping the reader task cancels it"]
    pub fn start(self) -> ReaderTask {
        let cancel = CancellationToken::new();
        let span = self.handle.span();
        let reader = FrameReader::new(self.handle.clone(), self.dispatcher, cancel.clone());
        let join = tokio::spawn(reader.run().instrument(span));

        ReaderTask {
            handle: self.handle,
            join,
            cancel: DroppingCancellationToken(cancel),
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Cancels the inner [`CancellationToken`] when dropped.
///
/// Kept separate from [`ReaderTask`] so that [`ReaderTask::join`] can move the join handle out
/// <https://doc.rust-lang.org/error_codes/E0509.html>.
#[derive(Debug)]
struct DroppingCancellationToken(CancellationToken);

impl Drop for DroppingCancellationToken {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// The running reader of a connection.
///
/// Dropping it cancels the reader.
#[derive(Debug)]
pub struct ReaderTask {
    handle: ConnectionHandle,
    join: JoinHandle<Result<()>>,
    cancel: DroppingCancellationToken,
}

impl ReaderTask {
    #[must_use]
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Stop the reader before its next receive completes.
    ///
    /// Nothing is sent to the peer; use [`ConnectionHandle::close`] for a graceful shutdown.
    pub fn cancel(&self) {
        self.cancel.0.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the reader to terminate.
    ///
    /// Resolves to `Ok(())` after a CLOSE frame or cancellation, and to the fault that ended the
    /// loop otherwise.
    pub async fn join(self) -> Result<()> {
        let Self { join, cancel, .. } = self;
        let outcome = join.await;
        drop(cancel);
        outcome.map_err(|e| Error::with_source(Kind::Internal, e))?
    }
}
