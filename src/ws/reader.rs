use std::ops::ControlFlow;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::connection::{ConnectionHandle, ConnectionState};
use super::dispatcher::CallbackDispatcher;
use super::error::WsError;
use super::event::Event;
use super::frame::{Frame, OpCode};
use super::heartbeat;
use crate::Result;

/// Reads frames off the transport one at a time and routes them.
///
/// A frame's handler completes before the next frame is read. The loop ends on a CLOSE frame,
/// a transport or decode fault, or cancellation.
pub(crate) struct FrameReader {
    connection: ConnectionHandle,
    dispatcher: CallbackDispatcher,
    cancel: CancellationToken,
}

impl FrameReader {
    pub(crate) fn new(
        connection: ConnectionHandle,
        dispatcher: CallbackDispatcher,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connection,
            dispatcher,
            cancel,
        }
    }

    pub(crate) async fn run(self) -> Result<()> {
        loop {
            let received = tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    tracing::debug!("Reader cancellation requested, terminating...");
                    self.connection.set_state(ConnectionState::Closed);
                    return Ok(());
                }
                received = self.receive() => received,
            };

            let outcome = match received {
                Ok(frame) => self.route(frame).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => return Ok(()),
                Err(e) => {
                    match &e {
                        WsError::ConnectionLost => tracing::error!("Lost websocket connection"),
                        WsError::ConnectionTimeout => {
                            tracing::error!("Websocket connection timeout");
                        }
                        WsError::Decode(_) => tracing::error!(error = %e, "Undecodable TEXT frame"),
                        _ => tracing::error!("Websocket exception: {e}"),
                    }
                    self.connection.set_state(ConnectionState::Closed);
                    return Err(e.into());
                }
            }
        }
    }

    async fn receive(&self) -> std::result::Result<Frame, WsError> {
        let transport = self.connection.transport();
        match self.connection.timeout() {
            Some(duration) => timeout(duration, transport.recv())
                .await
                .map_err(|_elapsed| WsError::ConnectionTimeout)?,
            None => transport.recv().await,
        }
    }

    async fn route(&self, frame: Frame) -> std::result::Result<ControlFlow<()>, WsError> {
        match frame.opcode {
            OpCode::Text => {
                let text = frame.decode_text()?;
                tracing::trace!(%text, "Received TEXT frame");
                self.dispatcher
                    .dispatch(&self.connection, Event::Message(text))
                    .await;
            }
            OpCode::Ping => {
                heartbeat::on_ping(&self.dispatcher, &self.connection, frame.payload).await?;
            }
            OpCode::Pong => heartbeat::on_pong(&self.dispatcher, &self.connection).await,
            OpCode::Close => {
                tracing::warn!("CLOSE frame received, closing websocket connection");
                self.connection.set_state(ConnectionState::Closed);
                self.dispatcher.dispatch(&self.connection, Event::Close).await;
                return Ok(ControlFlow::Break(()));
            }
            opcode => tracing::trace!(%opcode, "Ignoring frame"),
        }

        Ok(ControlFlow::Continue(()))
    }
}
