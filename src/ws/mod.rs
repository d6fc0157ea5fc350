//! Streaming feed connection.
//!
//! A connection is opened once, then a single reader task pulls frames off the transport and
//! routes them to an [`EventHandler`].
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: performs the handshake, delivers the open event, spawns the reader
//! - [`ConnectionHandle`]: shared handle for sending, pinging and closing from any task
//! - [`ReaderTask`]: the running reader; join it for the outcome or cancel it
//! - [`Transport`]: framed duplex channel, [`TungsteniteTransport`] by default
//! - [`EventHandler`]: receives [`Event`]s; see [`Callbacks`] and [`ChannelHandler`]
//!
//! Handler errors and panics are contained and reported as [`Event::Error`]. Transport faults
//! and undecodable TEXT frames end the reader and are returned from [`ReaderTask::join`].
//! There is no reconnection.
//!
//! # Example
//!
//! ```ignore
//! let (handler, mut events) = ChannelHandler::new(256);
//! let connection = ConnectionManager::open(config, handler).await?;
//! let reader = connection.start();
//!
//! while let Some(event) = events.recv().await {
//!     if let Event::Message(text) = event {
//!         handle_update(&text);
//!     }
//! }
//! reader.join().await?;
//! ```

pub mod config;
pub mod connection;
mod dispatcher;
pub mod error;
pub mod event;
pub mod frame;
mod heartbeat;
#[cfg(test)]
mod mock;
mod reader;
pub mod transport;

pub use config::Config;
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionState, ReaderTask};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use error::{BoxError, HandlerFault};
pub use event::{Callbacks, ChannelHandler, Event, EventHandler, EventKind, HandlerResult};
pub use frame::{Frame, OpCode};
pub use transport::{Transport, TungsteniteTransport};
