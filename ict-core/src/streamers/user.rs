//! Private user-data stream: account/order updates translated into
//! [`Event::OrderPlaced`]/[`Event::OrderFilled`]/[`Event::PositionUpdate`]
//! on the bus. Maintains a listen key, renews it per exchange rules, and
//! on reconnect emits a resync marker rather than replaying — the engine
//! refreshes its caches from REST instead.

use crate::bus::EventBus;
use crate::core::types::{Event, EventKind, Order, Position};
use crate::resilience::backoff::{BackoffConfig, ExponentialBackoff};
use crate::streamers::market::StreamerError;
use async_trait::async_trait;
use tracing::{info, warn};

/// What a concrete exchange user-data adapter implements. `run_once` is
/// expected to maintain the listen key for its own duration and block
/// until the connection drops.
#[async_trait]
pub trait PrivateUserStreamer: Send + Sync {
    async fn run_once(&self, bus: &EventBus) -> Result<(), StreamerError>;
}

/// Reconnect-with-backoff driver for a [`PrivateUserStreamer`]. Unlike the
/// market-data side, every reconnect also publishes a resync marker per
/// symbol so the engine knows to treat its position cache as stale until
/// refreshed.
pub async fn run_with_reconnect<S: PrivateUserStreamer>(streamer: &S, symbols: &[String], bus: &EventBus, backoff_config: BackoffConfig) {
    let mut backoff = ExponentialBackoff::with_config(backoff_config);
    let mut first_connection = true;
    loop {
        if !first_connection {
            for symbol in symbols {
                bus.publish(Event::new(EventKind::ResyncRequested { symbol: symbol.clone() }));
            }
        }
        first_connection = false;

        match streamer.run_once(bus).await {
            Ok(()) => {
                info!("user data stream ended cleanly");
                backoff.reset();
            }
            Err(e) => {
                warn!(%e, "user data stream disconnected");
                let Some(delay) = backoff.next_delay() else {
                    warn!("user data stream reconnect budget exhausted, giving up");
                    return;
                };
                tokio::time::sleep(delay).await;
            }
        }
    }
}

pub fn publish_order_update(bus: &EventBus, kind: fn(Order) -> EventKind, order: Order) {
    bus.publish(Event::new(kind(order)));
}

pub fn publish_position_update(bus: &EventBus, position: Position) {
    bus.publish(Event::new(EventKind::PositionUpdate(position)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::QueueKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyThenClean {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl PrivateUserStreamer for FlakyThenClean {
        async fn run_once(&self, _bus: &EventBus) -> Result<(), StreamerError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(StreamerError::ConnectFailed("simulated drop".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn reconnect_emits_a_resync_marker_per_symbol() {
        let streamer = FlakyThenClean { attempts: AtomicUsize::new(0) };
        let bus = EventBus::new(16);
        let symbols = vec!["BTCUSDT".to_string()];
        run_with_reconnect(&streamer, &symbols, &bus, BackoffConfig::aggressive()).await;

        let mut rx = bus.take_receiver(QueueKind::Order).unwrap();
        let event = rx.try_recv().expect("resync marker should have been published on reconnect");
        assert!(matches!(event.kind, EventKind::ResyncRequested { ref symbol } if symbol == "BTCUSDT"));
    }
}
