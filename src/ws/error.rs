#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;
use std::io::ErrorKind;

use tokio_tungstenite::tungstenite::{self, error::ProtocolError};

use super::event::EventKind;
use crate::error::{Error, Kind};

/// Boxed error returned by event handlers.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// WebSocket error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// The opening handshake could not complete
    Handshake(tungstenite::Error),
    /// The opening handshake did not complete within the configured timeout
    HandshakeTimeout,
    /// The peer went away without a closing handshake, or the connection was already closed
    ConnectionLost,
    /// No frame arrived within the configured timeout
    ConnectionTimeout,
    /// Any other error raised by the transport
    Transport(tungstenite::Error),
    /// A TEXT frame carried a payload that is not valid UTF-8
    Decode(String),
}

impl WsError {
    /// Classify an error raised by an open tungstenite stream.
    pub(crate) fn from_transport(error: tungstenite::Error) -> Self {
        match error {
            tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                Self::ConnectionLost
            }
            tungstenite::Error::Io(ref e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::BrokenPipe
                        | ErrorKind::UnexpectedEof
                ) =>
            {
                Self::ConnectionLost
            }
            tungstenite::Error::Io(ref e) if e.kind() == ErrorKind::TimedOut => {
                Self::ConnectionTimeout
            }
            tungstenite::Error::Utf8(reason) => Self::Decode(reason),
            other => Self::Transport(other),
        }
    }
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake(e) => write!(f, "WebSocket handshake failed: {e}"),
            Self::HandshakeTimeout => write!(f, "WebSocket handshake timed out"),
            Self::ConnectionLost => write!(f, "WebSocket connection lost"),
            Self::ConnectionTimeout => write!(f, "WebSocket receive timed out"),
            Self::Transport(e) => write!(f, "WebSocket transport error: {e}"),
            Self::Decode(e) => write!(f, "TEXT frame is not valid UTF-8: {e}"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Handshake(e) | Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<WsError> for Error {
    fn from(e: WsError) -> Self {
        let kind = match e {
            WsError::Handshake(_) | WsError::HandshakeTimeout => Kind::Connection,
            _ => Kind::WebSocket,
        };
        Error::with_source(kind, e)
    }
}

/// A fault raised by an event handler and contained by the dispatcher.
///
/// Faults never escape the dispatcher: they are logged and, unless the faulting handler was
/// itself handling [`EventKind::Error`], forwarded as an error event.
#[non_exhaustive]
#[derive(Debug)]
pub enum HandlerFault {
    /// The handler returned an error
    Failed {
        /// Event the handler was processing
        event: EventKind,
        /// Error returned by the handler
        source: BoxError,
    },
    /// The handler panicked
    Panicked {
        /// Event the handler was processing
        event: EventKind,
        /// Panic payload, when it was a string
        message: String,
    },
}

impl HandlerFault {
    /// The event whose handler faulted.
    #[must_use]
    pub fn event(&self) -> EventKind {
        match self {
            Self::Failed { event, .. } | Self::Panicked { event, .. } => *event,
        }
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { event, source } => write!(f, "{event} handler failed: {source}"),
            Self::Panicked { event, message } => write!(f, "{event} handler panicked: {message}"),
        }
    }
}

impl StdError for HandlerFault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Failed { source, .. } => Some(source.as_ref()),
            Self::Panicked { .. } => None,
        }
    }
}
