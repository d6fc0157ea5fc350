use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use super::error::WsError;
use super::frame::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected, framed duplex channel.
///
/// Only one task reads at a time; sends may come from any task concurrently with that read, so
/// implementations must make `recv` and the `send_*` methods safe to interleave.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Wait for the next frame.
    async fn recv(&self) -> Result<Frame, WsError>;

    async fn send_text(&self, text: String) -> Result<(), WsError>;

    async fn send_ping(&self, payload: Bytes) -> Result<(), WsError>;

    async fn send_pong(&self, payload: Bytes) -> Result<(), WsError>;

    /// Start the closing handshake. Does not wait for the peer's reply.
    async fn send_close(&self) -> Result<(), WsError>;

    /// Whether the transport still considers itself connected.
    fn is_connected(&self) -> bool;
}

/// [`Transport`] over a `tokio-tungstenite` client stream.
///
/// The stream is split so that a pending read never blocks outgoing frames.
pub struct TungsteniteTransport {
    reader: Mutex<SplitStream<WsStream>>,
    writer: Mutex<SplitSink<WsStream, Message>>,
    connected: AtomicBool,
}

impl TungsteniteTransport {
    /// Perform the opening handshake against `url`.
    ///
    /// With a `timeout`, the handshake fails with [`WsError::HandshakeTimeout`] if it has not
    /// completed in time.
    pub async fn connect(url: &Url, timeout_duration: Option<Duration>) -> Result<Self, WsError> {
        let handshake = connect_async(url.as_str());
        let result = match timeout_duration {
            Some(duration) => timeout(duration, handshake)
                .await
                .map_err(|_elapsed| WsError::HandshakeTimeout)?,
            None => handshake.await,
        };
        let (stream, _response) = result.map_err(WsError::Handshake)?;
        let (writer, reader) = stream.split();

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            connected: AtomicBool::new(true),
        })
    }

    async fn send(&self, message: Message) -> Result<(), WsError> {
        self.writer.lock().await.send(message).await.map_err(|e| {
            let error = WsError::from_transport(e);
            if matches!(error, WsError::ConnectionLost) {
                self.connected.store(false, Ordering::Release);
            }
            error
        })
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn recv(&self) -> Result<Frame, WsError> {
        let next = self.reader.lock().await.next().await;
        match next {
            Some(Ok(message)) => {
                if message.is_close() {
                    self.connected.store(false, Ordering::Release);
                }
                Ok(Frame::from(message))
            }
            Some(Err(e)) => {
                self.connected.store(false, Ordering::Release);
                Err(WsError::from_transport(e))
            }
            None => {
                self.connected.store(false, Ordering::Release);
                Err(WsError::ConnectionLost)
            }
        }
    }

    async fn send_text(&self, text: String) -> Result<(), WsError> {
        self.send(Message::Text(text.into())).await
    }

    async fn send_ping(&self, payload: Bytes) -> Result<(), WsError> {
        self.send(Message::Ping(payload)).await
    }

    async fn send_pong(&self, payload: Bytes) -> Result<(), WsError> {
        self.send(Message::Pong(payload)).await
    }

    async fn send_close(&self) -> Result<(), WsError> {
        self.send(Message::Close(None)).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
