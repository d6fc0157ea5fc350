//! Streams a public market-data feed and logs every update.
//!
//! Subscribes to an order book depth channel, answers heartbeats, and closes gracefully after a
//! handful of messages or on Ctrl-C.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info,feed_socket=debug cargo run --example feed
//! ```
//!
//! Point it elsewhere with `FEED_URL=wss://... cargo run --example feed`.

use std::time::Duration;

use feed_socket::ws::{ChannelHandler, Config, ConnectionManager, Event};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FEED_URL: &str = "wss://www.lbkex.net/ws/V2/";
const MAX_MESSAGES: usize = 10;

#[derive(Serialize)]
struct Subscribe<'a> {
    action: &'a str,
    subscribe: &'a str,
    depth: &'a str,
    pair: &'a str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let base_url = std::env::var("FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_owned());
    let config = Config::builder()
        .base_url(base_url)
        .timeout(Duration::from_secs(30))
        .build();

    let (handler, mut events) = ChannelHandler::new(256);
    let connection = ConnectionManager::open(config, handler).await?;
    let handle = connection.handle();
    let reader = connection.start();

    handle
        .send_json(&Subscribe {
            action: "subscribe",
            subscribe: "depth",
            depth: "10",
            pair: "eth_usdt",
        })
        .await?;

    let mut received = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Some(Event::Message(text)) => {
                    info!(%text, "update");
                    received += 1;
                    if received >= MAX_MESSAGES {
                        break;
                    }
                }
                Some(Event::Error(fault)) => warn!(%fault, "handler fault"),
                Some(Event::Close) | None => break,
                Some(other) => info!(event = %other.kind()),
            }
        }
    }

    // Stop consuming so a full channel cannot hold the reader back from the CLOSE reply
    drop(events);
    handle.close().await?;

    match timeout(Duration::from_secs(5), reader.join()).await {
        Ok(outcome) => outcome?,
        Err(_) => warn!("Peer did not acknowledge CLOSE in time"),
    }
    info!(received, "done");

    Ok(())
}
