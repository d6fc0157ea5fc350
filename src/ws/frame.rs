use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message;

use super::error::WsError;

/// Tag identifying a frame's purpose.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OpCode {
    Text,
    Binary,
    Ping,
    Pong,
    Close,
    /// Continuation and raw frames
    Other,
}

/// One unit of data read off the transport.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: OpCode,
    pub payload: Bytes,
}

impl Frame {
    #[must_use]
    pub fn new<P: Into<Bytes>>(opcode: OpCode, payload: P) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::new(OpCode::Text, text.into())
    }

    #[must_use]
    pub fn ping<P: Into<Bytes>>(payload: P) -> Self {
        Self::new(OpCode::Ping, payload)
    }

    #[must_use]
    pub fn pong<P: Into<Bytes>>(payload: P) -> Self {
        Self::new(OpCode::Pong, payload)
    }

    #[must_use]
    pub fn close() -> Self {
        Self::new(OpCode::Close, Bytes::new())
    }

    /// Decode the payload as UTF-8 text.
    pub fn decode_text(&self) -> Result<String, WsError> {
        std::str::from_utf8(&self.payload)
            .map(str::to_owned)
            .map_err(|e| WsError::Decode(e.to_string()))
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Self::new(OpCode::Text, Bytes::from(text)),
            Message::Binary(data) => Self::new(OpCode::Binary, data),
            Message::Ping(data) => Self::new(OpCode::Ping, data),
            Message::Pong(data) => Self::new(OpCode::Pong, data),
            Message::Close(close) => Self::new(
                OpCode::Close,
                close.map(|c| Bytes::from(c.reason)).unwrap_or_default(),
            ),
            Message::Frame(frame) => Self::new(OpCode::Other, frame.into_payload()),
        }
    }
}
