use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt as _;

use super::connection::ConnectionHandle;
use super::error::HandlerFault;
use super::event::{Event, EventHandler, EventKind};

/// Delivers events to the registered [`EventHandler`] and contains its faults.
///
/// This is the only place handler faults are caught. A fault is logged and forwarded as
/// [`Event::Error`]; a fault while handling [`Event::Error`] is only logged.
#[derive(Clone)]
pub(crate) struct CallbackDispatcher {
    handler: Arc<dyn EventHandler>,
}

impl CallbackDispatcher {
    pub(crate) fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self { handler }
    }

    pub(crate) async fn dispatch(&self, connection: &ConnectionHandle, event: Event) {
        let Some(fault) = self.invoke(connection, event).await else {
            return;
        };

        tracing::error!(
            event = %fault.event(),
            error = %fault,
            "Error from {} handler",
            fault.event()
        );

        if fault.event() == EventKind::Error {
            return;
        }

        if let Some(nested) = self.invoke(connection, Event::Error(fault)).await {
            tracing::error!(
                event = %EventKind::Error,
                error = %nested,
                "Error from error handler"
            );
        }
    }

    async fn invoke(&self, connection: &ConnectionHandle, event: Event) -> Option<HandlerFault> {
        let kind = event.kind();
        match AssertUnwindSafe(self.handler.handle(connection, event))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => None,
            Ok(Err(source)) => Some(HandlerFault::Failed {
                event: kind,
                source,
            }),
            Err(panic) => Some(HandlerFault::Panicked {
                event: kind,
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::mock::{MockTransport, Recorder, handle_for};

    #[tokio::test]
    async fn delivers_event_to_handler() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let recorder = Recorder::default();
        let dispatcher = CallbackDispatcher::new(Arc::new(recorder.clone()));

        dispatcher
            .dispatch(&connection, Event::Message("a".to_owned()))
            .await;

        assert_eq!(recorder.calls(), vec!["message:a"]);
    }

    #[tokio::test]
    async fn failing_handler_is_forwarded_to_error() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let recorder = Recorder::default().failing(EventKind::Message);
        let dispatcher = CallbackDispatcher::new(Arc::new(recorder.clone()));

        dispatcher
            .dispatch(&connection, Event::Message("a".to_owned()))
            .await;

        assert_eq!(
            recorder.calls(),
            vec![
                "message:a",
                "error:message handler failed: message handler rejected event"
            ]
        );
    }

    #[tokio::test]
    async fn panicking_handler_is_contained() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let recorder = Recorder::default().panicking(EventKind::Pong);
        let dispatcher = CallbackDispatcher::new(Arc::new(recorder.clone()));

        dispatcher.dispatch(&connection, Event::Pong).await;

        assert_eq!(
            recorder.calls(),
            vec!["pong", "error:pong handler panicked: pong handler panicked"]
        );
    }

    #[tokio::test]
    async fn error_handler_fault_is_not_forwarded_again() {
        let (transport, _frames) = MockTransport::new();
        let connection = handle_for(&transport);
        let recorder = Recorder::default()
            .failing(EventKind::Close)
            .failing(EventKind::Error);
        let dispatcher = CallbackDispatcher::new(Arc::new(recorder.clone()));

        dispatcher.dispatch(&connection, Event::Close).await;

        assert_eq!(recorder.calls().len(), 2);
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new("owned".to_owned());
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
