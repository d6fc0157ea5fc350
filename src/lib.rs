//! Background handler for a single persistent WebSocket feed.
//!
//! The handler owns the read loop, answers heartbeats and isolates event-handler faults so a
//! consumer only supplies what to do with each message.
//!
//! ```rust, no_run
//! use feed_socket::ws::{Callbacks, Config, ConnectionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::builder().base_url("wss://feed.example/ws").build();
//!     let callbacks = Callbacks::new().on_message(|_, text| {
//!         println!("{text}");
//!         Ok(())
//!     });
//!
//!     let reader = ConnectionManager::open(config, callbacks).await?.start();
//!     reader.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
