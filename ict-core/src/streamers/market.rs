//! Public market data stream: kline subscriptions for (symbol, interval)
//! pairs, translated into [`Event::CandleUpdate`]/[`Event::CandleClosed`]
//! on the bus. Reconnects with backoff, never replays history on
//! reconnect — backfill is the engine's job.

use crate::bus::EventBus;
use crate::core::types::{Candle, Event, EventKind};
use crate::resilience::backoff::{BackoffConfig, ExponentialBackoff};
use async_trait::async_trait;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug)]
pub enum StreamerError {
    ConnectFailed(String),
    SubscriptionRejected(String),
}

impl fmt::Display for StreamerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamerError::ConnectFailed(msg) => write!(f, "market stream connect failed: {msg}"),
            StreamerError::SubscriptionRejected(msg) => write!(f, "market stream subscription rejected: {msg}"),
        }
    }
}

impl std::error::Error for StreamerError {}

/// What a concrete exchange market-data adapter implements. The wire
/// protocol itself is out of scope — `run_once` is expected to block
/// until the connection drops or `StreamerError` can't be recovered from.
#[async_trait]
pub trait PublicMarketStreamer: Send + Sync {
    /// Subscribe to klines for `symbol`/`interval` and push candles to
    /// `bus` until the connection drops.
    async fn run_once(&self, symbol: &str, interval: &str, bus: &EventBus) -> Result<(), StreamerError>;
}

/// Drives a [`PublicMarketStreamer`] with reconnect-with-backoff forever.
/// Intended to run on its own task, never the engine's.
pub async fn run_with_reconnect<S: PublicMarketStreamer>(streamer: &S, symbol: &str, interval: &str, bus: &EventBus, backoff_config: BackoffConfig) {
    let mut backoff = ExponentialBackoff::with_config(backoff_config);
    loop {
        match streamer.run_once(symbol, interval, bus).await {
            Ok(()) => {
                info!(symbol, interval, "market stream ended cleanly");
                backoff.reset();
            }
            Err(e) => {
                warn!(symbol, interval, %e, "market stream disconnected");
                let Some(delay) = backoff.next_delay() else {
                    warn!(symbol, interval, "market stream reconnect budget exhausted, giving up");
                    return;
                };
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Publish a tick or closed candle onto the bus's data queue.
pub fn publish_candle(bus: &EventBus, candle: Candle) {
    let kind = if candle.is_closed { EventKind::CandleClosed(candle) } else { EventKind::CandleUpdate(candle) };
    bus.publish(Event::new(kind));
}
