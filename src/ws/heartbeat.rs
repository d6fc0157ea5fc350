//! Replies to PING and reports PONG control frames.

use bytes::Bytes;

use super::connection::ConnectionHandle;
use super::dispatcher::CallbackDispatcher;
use super::error::WsError;
use super::event::Event;

/// Deliver [`Event::Ping`], then answer with an empty PONG.
///
/// The reply goes out even when the ping handler faults. A failed reply is a transport fault.
pub(crate) async fn on_ping(
    dispatcher: &CallbackDispatcher,
    connection: &ConnectionHandle,
    payload: Bytes,
) -> Result<(), WsError> {
    dispatcher.dispatch(connection, Event::Ping(payload)).await;
    connection.transport().send_pong(Bytes::new()).await?;
    tracing::debug!("Received PING; PONG frame sent back");
    Ok(())
}

pub(crate) async fn on_pong(dispatcher: &CallbackDispatcher, connection: &ConnectionHandle) {
    tracing::debug!("Received PONG frame");
    dispatcher.dispatch(connection, Event::Pong).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ws::event::EventKind;
    use crate::ws::mock::{MockTransport, Recorder, Sent, handle_for};

    #[tokio::test]
    async fn ping_is_answered_with_empty_pong() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let recorder = Recorder::default();
        let dispatcher = CallbackDispatcher::new(Arc::new(recorder.clone()));

        on_ping(&dispatcher, &connection, Bytes::from_static(b"hb-1"))
            .await
            .unwrap();

        assert_eq!(recorder.calls(), vec!["ping:hb-1"]);
        assert_eq!(transport.sent(), vec![Sent::Pong(Bytes::new())]);
    }

    #[tokio::test]
    async fn pong_is_sent_even_when_ping_handler_panics() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let recorder = Recorder::default().panicking(EventKind::Ping);
        let dispatcher = CallbackDispatcher::new(Arc::new(recorder.clone()));

        on_ping(&dispatcher, &connection, Bytes::new()).await.unwrap();

        assert_eq!(transport.sent(), vec![Sent::Pong(Bytes::new())]);
        assert_eq!(recorder.calls().len(), 2);
    }

    #[tokio::test]
    async fn failed_pong_is_a_transport_fault() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let dispatcher = CallbackDispatcher::new(Arc::new(Recorder::default()));
        transport.disconnect();

        let result = on_ping(&dispatcher, &connection, Bytes::new()).await;

        assert!(matches!(result, Err(WsError::ConnectionLost)));
    }

    #[tokio::test]
    async fn pong_payload_is_not_forwarded() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let recorder = Recorder::default();
        let dispatcher = CallbackDispatcher::new(Arc::new(recorder.clone()));

        on_pong(&dispatcher, &connection).await;

        assert_eq!(recorder.calls(), vec!["pong"]);
        assert!(transport.sent().is_empty());
    }
}
