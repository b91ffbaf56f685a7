//! The event bus: three logical, ordered queues (data/signal/order) that
//! decouple producers (streamers, the engine itself) from the single
//! consumer task that drains each queue in FIFO order.
//!
//! Bounded with backpressure: publishers are multi-producer (streamers
//! publish concurrently with engine-internal publishers), so
//! `tokio::sync::mpsc` bounded channels back each queue rather than a
//! single-producer lock-free ring buffer.

use crate::core::types::{Event, EventKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Which of the three logical queues an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Data,
    Signal,
    Order,
}

impl QueueKind {
    const ALL: [QueueKind; 3] = [QueueKind::Data, QueueKind::Signal, QueueKind::Order];

    fn label(self) -> &'static str {
        match self {
            QueueKind::Data => "data",
            QueueKind::Signal => "signal",
            QueueKind::Order => "order",
        }
    }
}

/// Per-queue depth/drop accounting, shared between the publisher and the
/// watermark warning logic.
#[derive(Debug, Default)]
struct QueueCounters {
    capacity: usize,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    last_watermark_pct: AtomicU64,
}

/// A single logical queue: the sending half plus its counters. The
/// receiving half is handed out exactly once via [`EventBus::take_receiver`].
struct Queue {
    tx: mpsc::Sender<Event>,
    rx: parking_lot::Mutex<Option<mpsc::Receiver<Event>>>,
    counters: Arc<QueueCounters>,
}

/// Central event bus owning the three logical queues.
///
/// Cloning an `EventBus` is cheap (`Arc`-backed) so every producer holds its
/// own handle; only one consumer per queue should call
/// [`EventBus::take_receiver`], matching the engine's one-task-per-queue
/// drain loop.
#[derive(Clone)]
pub struct EventBus {
    queues: Arc<[Queue; 3]>,
}

impl EventBus {
    /// Build a bus with the given per-queue channel capacity.
    pub fn new(capacity: usize) -> Self {
        let make = || {
            let (tx, rx) = mpsc::channel(capacity);
            Queue {
                tx,
                rx: parking_lot::Mutex::new(Some(rx)),
                counters: Arc::new(QueueCounters {
                    capacity,
                    ..Default::default()
                }),
            }
        };
        Self {
            queues: Arc::new([make(), make(), make()]),
        }
    }

    fn queue(&self, kind: QueueKind) -> &Queue {
        &self.queues[kind as usize]
    }

    /// Publish an event onto the queue determined by its kind.
    ///
    /// Returns `false` (and records a drop) if the queue is full — the bus
    /// never blocks a producer indefinitely; backpressure is surfaced as a
    /// counted drop plus a rate-limited warning, not an unbounded queue.
    pub fn publish(&self, event: Event) -> bool {
        let kind = event.kind.queue();
        let queue = self.queue(kind);
        match queue.tx.try_send(event) {
            Ok(()) => {
                queue.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                self.check_watermark(kind, queue);
                true
            }
            Err(_) => {
                queue.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(queue = kind.label(), "event dropped: queue full");
                false
            }
        }
    }

    /// Take ownership of a queue's receiving half. Each queue's receiver can
    /// only be taken once; subsequent calls return `None`.
    pub fn take_receiver(&self, kind: QueueKind) -> Option<mpsc::Receiver<Event>> {
        self.queue(kind).rx.lock().take()
    }

    /// Current occupancy as a percentage of capacity, based on the gap
    /// between enqueued and dequeued counts is not tracked directly here;
    /// callers needing live depth should inspect `mpsc::Receiver::len()`
    /// from the consuming task. This reports the watermark off total
    /// throughput versus capacity rather than a live-depth gauge.
    fn check_watermark(&self, kind: QueueKind, queue: &Queue) {
        const WATERMARKS: [u64; 5] = [25, 50, 75, 90, 100];
        let enqueued = queue.counters.enqueued.load(Ordering::Relaxed);
        let pct = (enqueued.saturating_mul(100) / queue.counters.capacity.max(1) as u64).min(100);
        let last = queue.counters.last_watermark_pct.load(Ordering::Relaxed);
        for &wm in WATERMARKS.iter() {
            if pct >= wm && last < wm {
                warn!(queue = kind.label(), watermark_pct = wm, "event bus queue depth watermark crossed");
            }
        }
        queue.counters.last_watermark_pct.store(pct, Ordering::Relaxed);
    }

    /// Snapshot of drop counts per queue, for audit/health reporting.
    pub fn drop_counts(&self) -> Vec<(QueueKind, u64)> {
        QueueKind::ALL
            .iter()
            .map(|&kind| (kind, self.queue(kind).counters.dropped.load(Ordering::Relaxed)))
            .collect()
    }

    /// Broadcast a shutdown event onto the order queue, which every
    /// consumer loop treats as a drain-then-stop signal.
    pub fn request_shutdown(&self) {
        self.publish(Event::new(EventKind::ShutdownRequested));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Candle, UnixMillis};
    use rust_decimal_macros::dec;

    fn candle_event() -> Event {
        let candle = Candle::new(
            "BTCUSDT",
            "5m",
            UnixMillis(0),
            UnixMillis(1),
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100.5),
            dec!(10),
            true,
        )
        .unwrap();
        Event::new(EventKind::CandleClosed(candle))
    }

    #[test]
    fn publish_routes_to_correct_queue() {
        let bus = EventBus::new(8);
        assert!(bus.publish(candle_event()));
        let mut rx = bus.take_receiver(QueueKind::Data).unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn take_receiver_is_single_use() {
        let bus = EventBus::new(8);
        assert!(bus.take_receiver(QueueKind::Data).is_some());
        assert!(bus.take_receiver(QueueKind::Data).is_none());
    }

    #[test]
    fn full_queue_counts_a_drop_instead_of_blocking() {
        let bus = EventBus::new(1);
        assert!(bus.publish(candle_event()));
        assert!(!bus.publish(candle_event()));
        let drops = bus.drop_counts();
        let data_drops = drops.iter().find(|(k, _)| matches!(k, QueueKind::Data)).unwrap().1;
        assert_eq!(data_drops, 1);
    }
}
