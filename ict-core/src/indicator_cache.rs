//! Incremental cache of ICT zone state: order blocks and fair value gaps,
//! per (symbol, interval), updated on each closed candle instead of being
//! recomputed from full history every bar. Defaults (`max_order_blocks=20`,
//! `max_fvgs=15`, `indicator_expiry_candles=100`) match the strategy's own
//! profile defaults; zones age out after `indicator_expiry_candles` bars
//! without being touched, and the newest `max_*` entries are kept when a
//! push would exceed capacity.

use crate::core::types::{Candle, FairValueGap, OrderBlock, ZoneStatus};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::VecDeque;

/// Per-(symbol, interval) zone state.
struct ZoneState {
    order_blocks: VecDeque<OrderBlock>,
    fair_value_gaps: VecDeque<FairValueGap>,
    /// Index of the most recently processed candle, for expiry accounting.
    last_index: usize,
}

impl ZoneState {
    fn new() -> Self {
        Self {
            order_blocks: VecDeque::new(),
            fair_value_gaps: VecDeque::new(),
            last_index: 0,
        }
    }
}

/// Bounded, incrementally-updated cache of order blocks and fair value gaps.
///
/// Each interval keeps at most `max_order_blocks` order blocks and
/// `max_fvgs` FVGs (oldest evicted first); zones not touched within
/// `expiry_candles` closed candles are marked [`ZoneStatus::Invalidated`]
/// rather than removed, so callers can still see that a zone existed.
pub struct IndicatorStateCache {
    max_order_blocks: usize,
    max_fvgs: usize,
    expiry_candles: usize,
    state: DashMap<(String, String), RwLock<ZoneState>>,
}

impl IndicatorStateCache {
    pub fn new(max_order_blocks: usize, max_fvgs: usize) -> Self {
        Self::with_expiry(max_order_blocks, max_fvgs, 100)
    }

    pub fn with_expiry(max_order_blocks: usize, max_fvgs: usize, expiry_candles: usize) -> Self {
        Self {
            max_order_blocks,
            max_fvgs,
            expiry_candles,
            state: DashMap::new(),
        }
    }

    fn key(symbol: &str, interval: &str) -> (String, String) {
        (symbol.to_string(), interval.to_string())
    }

    /// Seed the cache from a batch of already-detected zones, e.g. when the
    /// engine warms up from historical candles on startup.
    pub fn initialize_from_history(
        &self,
        symbol: &str,
        interval: &str,
        order_blocks: Vec<OrderBlock>,
        fair_value_gaps: Vec<FairValueGap>,
    ) {
        let mut zone_state = ZoneState::new();
        zone_state.order_blocks = order_blocks.into_iter().collect();
        zone_state.fair_value_gaps = fair_value_gaps.into_iter().collect();
        self.truncate(&mut zone_state);
        self.state.insert(Self::key(symbol, interval), RwLock::new(zone_state));
    }

    fn truncate(&self, zone_state: &mut ZoneState) {
        while zone_state.order_blocks.len() > self.max_order_blocks {
            zone_state.order_blocks.pop_front();
        }
        while zone_state.fair_value_gaps.len() > self.max_fvgs {
            zone_state.fair_value_gaps.pop_front();
        }
    }

    /// Record newly detected zones from a freshly closed candle, evicting
    /// the oldest entries past capacity.
    pub fn push_order_block(&self, symbol: &str, interval: &str, ob: OrderBlock, candle_index: usize) {
        let entry = self
            .state
            .entry(Self::key(symbol, interval))
            .or_insert_with(|| RwLock::new(ZoneState::new()));
        let mut zone_state = entry.write();
        zone_state.order_blocks.push_back(ob);
        zone_state.last_index = candle_index;
        self.truncate(&mut zone_state);
    }

    pub fn push_fair_value_gap(&self, symbol: &str, interval: &str, fvg: FairValueGap, candle_index: usize) {
        let entry = self
            .state
            .entry(Self::key(symbol, interval))
            .or_insert_with(|| RwLock::new(ZoneState::new()));
        let mut zone_state = entry.write();
        zone_state.fair_value_gaps.push_back(fvg);
        zone_state.last_index = candle_index;
        self.truncate(&mut zone_state);
    }

    /// Re-evaluate every tracked zone's status against a newly closed
    /// candle: mark touched/mitigated/filled zones, and invalidate zones
    /// untouched for longer than `expiry_candles`.
    pub fn update_statuses(&self, symbol: &str, interval: &str, candle: &Candle, candle_index: usize) {
        let Some(entry) = self.state.get(&Self::key(symbol, interval)) else {
            return;
        };
        let mut zone_state = entry.write();
        zone_state.last_index = candle_index;
        let expiry = self.expiry_candles;

        for ob in zone_state.order_blocks.iter_mut() {
            if ob.status == ZoneStatus::Invalidated {
                continue;
            }
            if ob.contains(candle.close) {
                ob.status = if ob.status == ZoneStatus::Active {
                    ZoneStatus::Touched
                } else {
                    ZoneStatus::Mitigated
                };
            }
            if candle_index.saturating_sub(ob.formation_index) > expiry && ob.status != ZoneStatus::Mitigated {
                ob.status = ZoneStatus::Invalidated;
            }
        }

        for fvg in zone_state.fair_value_gaps.iter_mut() {
            if fvg.status == ZoneStatus::Invalidated {
                continue;
            }
            if fvg.contains(candle.close) {
                fvg.status = ZoneStatus::Touched;
                let gap_size = fvg.gap_high - fvg.gap_low;
                if !gap_size.is_zero() {
                    let filled = match fvg.direction {
                        crate::core::types::ZoneDirection::Bullish => candle.close - fvg.gap_low,
                        crate::core::types::ZoneDirection::Bearish => fvg.gap_high - candle.close,
                    };
                    fvg.fill_percent = (filled / gap_size).to_string().parse::<f64>().unwrap_or(0.0).clamp(0.0, 1.0);
                    if fvg.fill_percent >= 0.99 {
                        fvg.status = ZoneStatus::Filled;
                    }
                }
            }
            if candle_index.saturating_sub(fvg.formation_index) > expiry && fvg.status != ZoneStatus::Filled {
                fvg.status = ZoneStatus::Invalidated;
            }
        }
    }

    /// Active (not mitigated/filled/invalidated) order blocks for an
    /// interval, most recent last.
    pub fn get_active_order_blocks(&self, symbol: &str, interval: &str) -> Vec<OrderBlock> {
        self.state
            .get(&Self::key(symbol, interval))
            .map(|entry| {
                entry
                    .read()
                    .order_blocks
                    .iter()
                    .filter(|ob| matches!(ob.status, ZoneStatus::Active | ZoneStatus::Touched))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_active_fair_value_gaps(&self, symbol: &str, interval: &str) -> Vec<FairValueGap> {
        self.state
            .get(&Self::key(symbol, interval))
            .map(|entry| {
                entry
                    .read()
                    .fair_value_gaps
                    .iter()
                    .filter(|fvg| matches!(fvg.status, ZoneStatus::Active | ZoneStatus::Touched))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UnixMillis, ZoneDirection};
    use rust_decimal_macros::dec;

    fn bullish_ob(low: rust_decimal::Decimal, high: rust_decimal::Decimal, index: usize) -> OrderBlock {
        OrderBlock {
            direction: ZoneDirection::Bullish,
            high,
            low,
            displacement_size: dec!(1),
            strength: dec!(2),
            status: ZoneStatus::Active,
            formation_time: UnixMillis(0),
            formation_index: index,
        }
    }

    #[test]
    fn eviction_keeps_only_max_order_blocks() {
        let cache = IndicatorStateCache::new(2, 15);
        for i in 0..5 {
            cache.push_order_block("BTCUSDT", "5m", bullish_ob(dec!(100), dec!(101), i), i);
        }
        assert_eq!(cache.get_active_order_blocks("BTCUSDT", "5m").len(), 2);
    }

    #[test]
    fn touching_an_order_block_marks_it_touched() {
        let cache = IndicatorStateCache::new(20, 15);
        cache.push_order_block("BTCUSDT", "5m", bullish_ob(dec!(100), dec!(101), 0), 0);
        let candle = Candle::new("BTCUSDT", "5m", UnixMillis(0), UnixMillis(1), dec!(100.5), dec!(100.5), dec!(100.5), dec!(100.5), dec!(1), true).unwrap();
        cache.update_statuses("BTCUSDT", "5m", &candle, 1);
        let obs = cache.get_active_order_blocks("BTCUSDT", "5m");
        assert_eq!(obs[0].status, ZoneStatus::Touched);
    }

    #[test]
    fn expiry_invalidates_untouched_zones() {
        let cache = IndicatorStateCache::with_expiry(20, 15, 2);
        cache.push_order_block("BTCUSDT", "5m", bullish_ob(dec!(100), dec!(101), 0), 0);
        let far_candle = Candle::new("BTCUSDT", "5m", UnixMillis(0), UnixMillis(1), dec!(200), dec!(200), dec!(200), dec!(200), dec!(1), true).unwrap();
        cache.update_statuses("BTCUSDT", "5m", &far_candle, 10);
        assert!(cache.get_active_order_blocks("BTCUSDT", "5m").is_empty());
    }
}
