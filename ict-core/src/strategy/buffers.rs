//! Bounded per-interval candle history buffers.
//!
//! Each (symbol, interval) pair keeps only as many closed candles as the
//! active strategy's [`crate::core::types::ModuleRequirements`] demands,
//! plus a small margin, so memory stays flat regardless of uptime.

use crate::core::types::Candle;
use std::collections::{HashMap, VecDeque};

/// Default candle history kept per interval when no strategy requirement
/// overrides it.
pub const DEFAULT_BUFFER_LEN: usize = 200;

/// Ring buffer of closed candles for a single interval.
#[derive(Debug, Clone)]
pub struct CandleBuffer {
    capacity: usize,
    candles: VecDeque<Candle>,
}

impl CandleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            candles: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Append a newly closed candle, evicting the oldest if at capacity.
    /// Candles with `is_closed = false` are rejected — only closed candles
    /// may enter a strategy buffer.
    pub fn push_closed(&mut self, candle: Candle) -> bool {
        if !candle.is_closed {
            return false;
        }
        if self.candles.len() == self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
        true
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn as_slice_vec(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Candle> {
        self.candles.iter()
    }
}

/// All interval buffers for a single symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolBuffers {
    by_interval: HashMap<String, CandleBuffer>,
}

impl SymbolBuffers {
    /// Ensure a buffer exists for `interval` sized to at least `min_candles`
    /// (rounded up to [`DEFAULT_BUFFER_LEN`] when smaller), per a merged
    /// [`crate::core::types::ModuleRequirements`].
    pub fn ensure_interval(&mut self, interval: &str, min_candles: usize) {
        let capacity = min_candles.max(DEFAULT_BUFFER_LEN);
        self.by_interval
            .entry(interval.to_string())
            .or_insert_with(|| CandleBuffer::new(capacity));
    }

    pub fn push_closed(&mut self, interval: &str, candle: Candle) -> bool {
        self.by_interval
            .entry(interval.to_string())
            .or_insert_with(|| CandleBuffer::new(DEFAULT_BUFFER_LEN))
            .push_closed(candle)
    }

    pub fn get(&self, interval: &str) -> Option<&CandleBuffer> {
        self.by_interval.get(interval)
    }

    /// Whether every required interval has at least its minimum candle count.
    pub fn satisfies(&self, requirements: &crate::core::types::ModuleRequirements) -> bool {
        requirements
            .min_candles
            .iter()
            .all(|(interval, &min)| self.by_interval.get(interval).map(|b| b.len() >= min).unwrap_or(false))
    }

    /// Snapshot suitable for handing to a [`crate::strategy::StrategyContext`].
    pub fn snapshot(&self) -> HashMap<String, Vec<Candle>> {
        self.by_interval
            .iter()
            .map(|(interval, buf)| (interval.clone(), buf.as_slice_vec()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UnixMillis;
    use rust_decimal_macros::dec;

    fn candle(close: rust_decimal::Decimal) -> Candle {
        Candle::new("BTCUSDT", "5m", UnixMillis(0), UnixMillis(1), close, close, close, close, dec!(1), true).unwrap()
    }

    #[test]
    fn buffer_evicts_oldest_past_capacity() {
        let mut buf = CandleBuffer::new(2);
        buf.push_closed(candle(dec!(1)));
        buf.push_closed(candle(dec!(2)));
        buf.push_closed(candle(dec!(3)));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.iter().next().unwrap().close, dec!(2));
    }

    #[test]
    fn buffer_rejects_unclosed_candles() {
        let mut buf = CandleBuffer::new(2);
        let mut unclosed = candle(dec!(1));
        unclosed.is_closed = false;
        assert!(!buf.push_closed(unclosed));
        assert!(buf.is_empty());
    }

    #[test]
    fn symbol_buffers_satisfies_requirements() {
        let mut buffers = SymbolBuffers::default();
        buffers.ensure_interval("5m", 3);
        for _ in 0..2 {
            buffers.push_closed("5m", candle(dec!(1)));
        }
        let reqs = crate::core::types::ModuleRequirements::single("5m", 3);
        assert!(!buffers.satisfies(&reqs));
        buffers.push_closed("5m", candle(dec!(1)));
        assert!(buffers.satisfies(&reqs));
    }
}
