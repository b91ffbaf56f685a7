//! Smart Money Concepts helpers that sit alongside the structure/FVG/OB
//! detectors but don't belong to any one of them: displacement (the
//! strong impulsive move that leaves FVGs and order blocks behind it) and
//! inducement (a liquidity grab just before the real move). Grounded on
//! `src/strategies/ict/pricing/displacement_tp.py`'s `displacement_size`
//! usage (a single candle's range measured against its neighbors) and the
//! `strategies.ict.detectors.smc` import list in the package test.

use crate::core::types::{Candle, ZoneDirection};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Displacement {
    pub direction: ZoneDirection,
    pub size: Decimal,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inducement {
    pub level: Decimal,
    pub index: usize,
}

/// A displacement candle: a range at least `ratio` times the average
/// range of the preceding `lookback` candles, closing strongly in its
/// direction of travel.
pub fn detect_displacement(candles: &[Candle], lookback: usize, ratio: Decimal) -> Option<Displacement> {
    if candles.len() < lookback + 1 || lookback == 0 {
        return None;
    }
    let last_index = candles.len() - 1;
    let last = &candles[last_index];
    let window = &candles[last_index - lookback..last_index];
    let avg_range: Decimal = window.iter().map(|c| c.high - c.low).sum::<Decimal>() / Decimal::from(lookback);
    if avg_range.is_zero() {
        return None;
    }
    let last_range = last.high - last.low;
    if last_range / avg_range < ratio {
        return None;
    }
    let direction = if last.close > last.open { ZoneDirection::Bullish } else { ZoneDirection::Bearish };
    Some(Displacement { direction, size: last_range, index: last_index })
}

/// A one-candle liquidity grab: a wick beyond `level` that closes back on
/// the starting side, the false move that induces retail stops before the
/// real displacement.
pub fn detect_inducement(candles: &[Candle], level: Decimal, sweep_above: bool) -> Option<Inducement> {
    candles.iter().enumerate().find_map(|(i, c)| {
        let swept = if sweep_above { c.high > level && c.close < level } else { c.low < level && c.close > level };
        swept.then_some(Inducement { level, index: i })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::helpers::ohlc_candle;
    use rust_decimal_macros::dec;

    #[test]
    fn detects_a_displacement_candle_after_quiet_range() {
        let candles = vec![
            ohlc_candle("BTCUSDT", "1h", 0, dec!(100), dec!(101), dec!(99), dec!(100)),
            ohlc_candle("BTCUSDT", "1h", 1, dec!(100), dec!(101), dec!(99), dec!(100.5)),
            ohlc_candle("BTCUSDT", "1h", 2, dec!(100.5), dec!(120), dec!(100), dec!(119)),
        ];
        let d = detect_displacement(&candles, 2, dec!(3)).expect("strong move should qualify");
        assert_eq!(d.direction, ZoneDirection::Bullish);
        assert_eq!(d.index, 2);
    }

    #[test]
    fn no_displacement_when_range_is_unremarkable() {
        let candles = vec![
            ohlc_candle("BTCUSDT", "1h", 0, dec!(100), dec!(101), dec!(99), dec!(100)),
            ohlc_candle("BTCUSDT", "1h", 1, dec!(100), dec!(101), dec!(99), dec!(100.5)),
            ohlc_candle("BTCUSDT", "1h", 2, dec!(100.5), dec!(101.5), dec!(100), dec!(101)),
        ];
        assert!(detect_displacement(&candles, 2, dec!(3)).is_none());
    }

    #[test]
    fn inducement_requires_a_sweep_and_close_back_inside() {
        let candles = vec![ohlc_candle("BTCUSDT", "1h", 0, dec!(100), dec!(112), dec!(99), dec!(101))];
        assert!(detect_inducement(&candles, dec!(110), true).is_some());
        assert!(detect_inducement(&candles, dec!(120), true).is_none());
    }
}
