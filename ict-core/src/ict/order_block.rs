//! Order Block detection: the last opposite-colored candle before a
//! displacement move, treated as the zone institutional flow is likely to
//! defend on a retest. No order-block detector survived filtering in
//! `original_source/` (only its call sites in `ict_strategy.py` and the
//! `strategies.ict.detectors.order_block` import list in the package test
//! did) — this module's shape follows that import list and the market
//! structure/FVG detectors' established pattern (last candle before a
//! displacement, direction-tagged, filtered by a minimum strength ratio).

use crate::core::types::{Candle, OrderBlock, ZoneDirection, ZoneStatus};
use rust_decimal::Decimal;

/// A bullish order block: the last down-close candle before an up-close
/// candle whose range is at least `min_strength` times the order block
/// candle's own range (the displacement that makes the zone meaningful).
pub fn identify_bullish_ob(candles: &[Candle], min_strength: Decimal) -> Vec<OrderBlock> {
    let mut out = Vec::new();
    if candles.len() < 2 {
        return out;
    }
    for i in 0..candles.len() - 1 {
        let ob_candle = &candles[i];
        let displacement = &candles[i + 1];
        if ob_candle.close >= ob_candle.open {
            continue;
        }
        if displacement.close <= displacement.open {
            continue;
        }
        let ob_range = ob_candle.high - ob_candle.low;
        if ob_range.is_zero() {
            continue;
        }
        let displacement_range = displacement.high - displacement.low;
        let strength = displacement_range / ob_range;
        if strength < min_strength {
            continue;
        }
        out.push(OrderBlock {
            direction: ZoneDirection::Bullish,
            high: ob_candle.high,
            low: ob_candle.low,
            displacement_size: displacement_range,
            strength,
            status: ZoneStatus::Active,
            formation_time: ob_candle.open_time,
            formation_index: i,
        });
    }
    out
}

/// Mirror of [`identify_bullish_ob`]: the last up-close candle before a
/// down-close displacement.
pub fn identify_bearish_ob(candles: &[Candle], min_strength: Decimal) -> Vec<OrderBlock> {
    let mut out = Vec::new();
    if candles.len() < 2 {
        return out;
    }
    for i in 0..candles.len() - 1 {
        let ob_candle = &candles[i];
        let displacement = &candles[i + 1];
        if ob_candle.close <= ob_candle.open {
            continue;
        }
        if displacement.close >= displacement.open {
            continue;
        }
        let ob_range = ob_candle.high - ob_candle.low;
        if ob_range.is_zero() {
            continue;
        }
        let displacement_range = displacement.high - displacement.low;
        let strength = displacement_range / ob_range;
        if strength < min_strength {
            continue;
        }
        out.push(OrderBlock {
            direction: ZoneDirection::Bearish,
            high: ob_candle.high,
            low: ob_candle.low,
            displacement_size: displacement_range,
            strength,
            status: ZoneStatus::Active,
            formation_time: ob_candle.open_time,
            formation_index: i,
        });
    }
    out
}

/// Nearest-by-midpoint order block in the given direction, optionally
/// restricted to zones that have not yet been fully mitigated.
pub fn find_nearest_ob<'a>(
    obs: &'a [OrderBlock],
    current_price: Decimal,
    direction: ZoneDirection,
    only_active: bool,
) -> Option<&'a OrderBlock> {
    obs.iter()
        .filter(|ob| ob.direction == direction)
        .filter(|ob| !only_active || matches!(ob.status, ZoneStatus::Active | ZoneStatus::Touched))
        .min_by_key(|ob| (((ob.high + ob.low) / Decimal::TWO) - current_price).abs())
}

/// The order block's own high/low bounds, as the entry zone for a retest.
pub fn get_ob_zone(ob: &OrderBlock) -> (Decimal, Decimal) {
    (ob.low, ob.high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::helpers::ohlc_candle;
    use rust_decimal_macros::dec;

    #[test]
    fn bullish_ob_is_the_down_candle_before_a_strong_up_move() {
        let candles = vec![
            ohlc_candle("BTCUSDT", "1h", 0, dec!(105), dec!(106), dec!(100), dec!(101)),
            ohlc_candle("BTCUSDT", "1h", 1, dec!(101), dec!(120), dec!(101), dec!(119)),
        ];
        let obs = identify_bullish_ob(&candles, dec!(1.5));
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].low, dec!(100));
        assert_eq!(obs[0].high, dec!(106));
    }

    #[test]
    fn weak_displacement_does_not_qualify() {
        let candles = vec![
            ohlc_candle("BTCUSDT", "1h", 0, dec!(105), dec!(106), dec!(100), dec!(101)),
            ohlc_candle("BTCUSDT", "1h", 1, dec!(101), dec!(103), dec!(101), dec!(102.5)),
        ];
        assert!(identify_bullish_ob(&candles, dec!(1.5)).is_empty());
    }
}
