//! Swing points, Break of Structure (BOS), Change of Character (CHoCH) and
//! overall trend. Grounded on `src/detectors/ict_market_structure.py` and
//! its test suite (`tests/detectors/test_ict_market_structure.py`), which
//! is the only surviving copy of this detector's exact semantics.

use crate::core::types::{Candle, Trend, UnixMillis, ZoneDirection};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwingPoint {
    pub index: usize,
    pub price: Decimal,
    pub kind: SwingKind,
    pub time: UnixMillis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureEventKind {
    Bos,
    Choch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureEvent {
    pub kind: StructureEventKind,
    pub direction: ZoneDirection,
    pub price: Decimal,
    pub index: usize,
}

/// A pivot high: strictly the highest high within `left_bars` before and
/// `right_bars` after. Equal highs either side do not count — a flat top
/// is not a swing.
pub fn identify_swing_highs(candles: &[Candle], left_bars: usize, right_bars: usize) -> Vec<SwingPoint> {
    let mut out = Vec::new();
    if candles.len() < left_bars + right_bars + 1 {
        return out;
    }
    for i in left_bars..candles.len() - right_bars {
        let pivot = candles[i].high;
        let is_swing = (i - left_bars..i).all(|j| candles[j].high < pivot)
            && (i + 1..=i + right_bars).all(|j| candles[j].high < pivot);
        if is_swing {
            out.push(SwingPoint { index: i, price: pivot, kind: SwingKind::High, time: candles[i].open_time });
        }
    }
    out
}

/// Mirror of [`identify_swing_highs`] for pivot lows.
pub fn identify_swing_lows(candles: &[Candle], left_bars: usize, right_bars: usize) -> Vec<SwingPoint> {
    let mut out = Vec::new();
    if candles.len() < left_bars + right_bars + 1 {
        return out;
    }
    for i in left_bars..candles.len() - right_bars {
        let pivot = candles[i].low;
        let is_swing = (i - left_bars..i).all(|j| candles[j].low > pivot)
            && (i + 1..=i + right_bars).all(|j| candles[j].low > pivot);
        if is_swing {
            out.push(SwingPoint { index: i, price: pivot, kind: SwingKind::Low, time: candles[i].open_time });
        }
    }
    out
}

/// Break of Structure: a swing that extends the prevailing trend — a
/// higher swing high than the last one (bullish) or a lower swing low
/// (bearish).
pub fn detect_bos(candles: &[Candle], swing_lookback: usize) -> Vec<StructureEvent> {
    let highs = identify_swing_highs(candles, swing_lookback, swing_lookback);
    let lows = identify_swing_lows(candles, swing_lookback, swing_lookback);
    let mut events = Vec::new();
    for w in highs.windows(2) {
        if w[1].price > w[0].price {
            events.push(StructureEvent { kind: StructureEventKind::Bos, direction: ZoneDirection::Bullish, price: w[1].price, index: w[1].index });
        }
    }
    for w in lows.windows(2) {
        if w[1].price < w[0].price {
            events.push(StructureEvent { kind: StructureEventKind::Bos, direction: ZoneDirection::Bearish, price: w[1].price, index: w[1].index });
        }
    }
    events
}

/// Change of Character: a sequence of swings forming one trend (lower
/// highs, or higher lows) followed by a close that breaks back through the
/// earlier swing level — the first sign the trend has flipped.
pub fn detect_choch(candles: &[Candle], swing_lookback: usize) -> Vec<StructureEvent> {
    let highs = identify_swing_highs(candles, swing_lookback, swing_lookback);
    let lows = identify_swing_lows(candles, swing_lookback, swing_lookback);
    let mut events = Vec::new();

    for w in highs.windows(2) {
        let (first, second) = (&w[0], &w[1]);
        if second.price < first.price {
            if let Some((idx, _)) = candles.iter().enumerate().skip(second.index + 1).find(|(_, c)| c.close > first.price) {
                events.push(StructureEvent { kind: StructureEventKind::Choch, direction: ZoneDirection::Bullish, price: first.price, index: idx });
            }
        }
    }
    for w in lows.windows(2) {
        let (first, second) = (&w[0], &w[1]);
        if second.price > first.price {
            if let Some((idx, _)) = candles.iter().enumerate().skip(second.index + 1).find(|(_, c)| c.close < first.price) {
                events.push(StructureEvent { kind: StructureEventKind::Choch, direction: ZoneDirection::Bearish, price: first.price, index: idx });
            }
        }
    }
    events
}

/// Overall trend from the last `min_swings` swing highs and lows: bullish
/// when both series are strictly ascending, bearish when both are strictly
/// descending, `None` otherwise (consolidation or insufficient data).
pub fn get_current_trend(candles: &[Candle], swing_lookback: usize, min_swings: usize) -> Option<Trend> {
    let highs = identify_swing_highs(candles, swing_lookback, swing_lookback);
    let lows = identify_swing_lows(candles, swing_lookback, swing_lookback);
    if highs.len() < min_swings || lows.len() < min_swings || min_swings == 0 {
        return None;
    }
    let recent_highs = &highs[highs.len() - min_swings..];
    let recent_lows = &lows[lows.len() - min_swings..];
    let highs_ascending = recent_highs.windows(2).all(|w| w[1].price > w[0].price);
    let highs_descending = recent_highs.windows(2).all(|w| w[1].price < w[0].price);
    let lows_ascending = recent_lows.windows(2).all(|w| w[1].price > w[0].price);
    let lows_descending = recent_lows.windows(2).all(|w| w[1].price < w[0].price);

    if highs_ascending && lows_ascending {
        Some(Trend::Bullish)
    } else if highs_descending && lows_descending {
        Some(Trend::Bearish)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::helpers::ohlc_candle;
    use rust_decimal_macros::dec;

    fn candle(i: i64, o: i64, h: i64, l: i64, c: i64) -> Candle {
        ohlc_candle("BTCUSDT", "1m", i, Decimal::from(o), Decimal::from(h), Decimal::from(l), Decimal::from(c))
    }

    #[test]
    fn no_swing_highs_in_a_continuous_uptrend() {
        let candles: Vec<Candle> = (0..15).map(|i| candle(i, 100 + i, 101 + i, 99 + i, 100 + i)).collect();
        assert!(identify_swing_highs(&candles, 3, 3).is_empty());
    }

    #[test]
    fn detects_a_clear_swing_high() {
        let candles = vec![
            candle(0, 100, 101, 99, 100),
            candle(1, 100, 102, 100, 101),
            candle(2, 101, 103, 101, 102),
            candle(3, 102, 105, 102, 104),
            candle(4, 104, 107, 103, 106),
            candle(5, 106, 110, 105, 109),
            candle(6, 109, 109, 106, 107),
            candle(7, 107, 108, 105, 106),
            candle(8, 106, 107, 104, 105),
            candle(9, 105, 106, 103, 104),
            candle(10, 104, 105, 102, 103),
            candle(11, 103, 104, 101, 102),
        ];
        let swings = identify_swing_highs(&candles, 3, 3);
        let hit = swings.iter().find(|s| s.index == 5);
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().price, dec!(110));
    }

    #[test]
    fn insufficient_candles_yield_no_swings() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 100, 101, 99, 100)).collect();
        assert!(identify_swing_highs(&candles, 5, 5).is_empty());
        assert!(identify_swing_lows(&candles, 5, 5).is_empty());
    }

    #[test]
    fn bos_fires_on_a_higher_high_after_a_swing_high() {
        let candles = vec![
            candle(0, 100, 101, 99, 100),
            candle(1, 100, 103, 100, 102),
            candle(2, 102, 105, 102, 104),
            candle(3, 104, 110, 104, 108),
            candle(4, 108, 108, 105, 106),
            candle(5, 106, 107, 104, 105),
            candle(6, 105, 106, 103, 104),
            candle(7, 104, 108, 104, 107),
            candle(8, 107, 112, 107, 110),
            candle(9, 110, 115, 110, 113),
            candle(10, 113, 113, 110, 111),
            candle(11, 111, 112, 109, 110),
            candle(12, 110, 111, 108, 109),
            candle(13, 109, 110, 107, 108),
        ];
        let events = detect_bos(&candles, 2);
        assert!(events.iter().any(|e| e.kind == StructureEventKind::Bos && e.direction == ZoneDirection::Bullish));
    }

    #[test]
    fn no_bos_in_a_flat_consolidation() {
        let candles: Vec<Candle> = (0..20).map(|i| candle(i, 100, 102, 98, 100 + (i % 2))).collect();
        assert!(detect_bos(&candles, 3).is_empty());
    }

    #[test]
    fn no_choch_in_a_strong_trend() {
        let candles: Vec<Candle> = (0..15).map(|i| candle(i, 100 + i * 2, 102 + i * 2, 99 + i * 2, 101 + i * 2)).collect();
        assert!(detect_choch(&candles, 3).is_empty());
    }

    #[test]
    fn insufficient_data_yields_no_trend() {
        let candles: Vec<Candle> = (0..5).map(|i| candle(i, 100, 101, 99, 100)).collect();
        assert_eq!(get_current_trend(&candles, 5, 2), None);
    }
}
