//! Fair Value Gap detection: the 3-candle imbalance pattern left behind by
//! a displacement move. Grounded on `src/detectors/ict_fvg.py`.

use crate::core::types::{Candle, FairValueGap, ZoneDirection, ZoneStatus};
use rust_decimal::Decimal;

/// Bullish FVG: `candle[0].high < candle[2].low`, the gap left between them
/// filtered by `min_gap_percent` of the average of the two bounding prices.
pub fn detect_bullish_fvg(candles: &[Candle], min_gap_percent: Decimal) -> Vec<FairValueGap> {
    let mut out = Vec::new();
    if candles.len() < 3 {
        return out;
    }
    for i in 0..candles.len() - 2 {
        let c0 = &candles[i];
        let c1 = &candles[i + 1];
        let c2 = &candles[i + 2];
        if c0.high >= c2.low {
            continue;
        }
        let gap_low = c0.high;
        let gap_high = c2.low;
        let gap_size = gap_high - gap_low;
        let avg_price = (c0.high + c2.low) / Decimal::TWO;
        if avg_price.is_zero() {
            continue;
        }
        let gap_percent = gap_size / avg_price;
        if gap_percent < min_gap_percent {
            continue;
        }
        out.push(FairValueGap {
            direction: ZoneDirection::Bullish,
            gap_low,
            gap_high,
            formation_time: c1.open_time,
            formation_index: i + 1,
            status: ZoneStatus::Active,
            fill_percent: 0.0,
        });
    }
    out
}

/// Bearish FVG: `candle[2].high < candle[0].low`, mirror of the bullish case.
pub fn detect_bearish_fvg(candles: &[Candle], min_gap_percent: Decimal) -> Vec<FairValueGap> {
    let mut out = Vec::new();
    if candles.len() < 3 {
        return out;
    }
    for i in 0..candles.len() - 2 {
        let c0 = &candles[i];
        let c1 = &candles[i + 1];
        let c2 = &candles[i + 2];
        if c2.high >= c0.low {
            continue;
        }
        let gap_high = c0.low;
        let gap_low = c2.high;
        let gap_size = gap_high - gap_low;
        let avg_price = (c0.low + c2.high) / Decimal::TWO;
        if avg_price.is_zero() {
            continue;
        }
        let gap_percent = gap_size / avg_price;
        if gap_percent < min_gap_percent {
            continue;
        }
        out.push(FairValueGap {
            direction: ZoneDirection::Bearish,
            gap_low,
            gap_high,
            formation_time: c1.open_time,
            formation_index: i + 1,
            status: ZoneStatus::Active,
            fill_percent: 0.0,
        });
    }
    out
}

/// Both directions in one pass.
pub fn detect_all_fvg(candles: &[Candle], min_gap_percent: Decimal) -> (Vec<FairValueGap>, Vec<FairValueGap>) {
    (detect_bullish_fvg(candles, min_gap_percent), detect_bearish_fvg(candles, min_gap_percent))
}

/// A FVG is filled once price trades back into its gap zone.
pub fn is_fvg_filled(fvg: &FairValueGap, current_price: Decimal) -> bool {
    fvg.contains(current_price) || fvg.status == ZoneStatus::Filled
}

/// Nearest-by-midpoint FVG in the given direction, optionally restricted to
/// unfilled zones (Active/Touched).
pub fn find_nearest_fvg<'a>(
    fvgs: &'a [FairValueGap],
    current_price: Decimal,
    direction: ZoneDirection,
    only_unfilled: bool,
) -> Option<&'a FairValueGap> {
    fvgs.iter()
        .filter(|f| f.direction == direction)
        .filter(|f| !only_unfilled || matches!(f.status, ZoneStatus::Active | ZoneStatus::Touched))
        .min_by_key(|f| (f.midpoint() - current_price).abs())
}

/// Optimal entry sub-zone within a FVG: the lower portion for a bullish gap
/// (cheaper to re-enter long), the upper portion for a bearish gap.
pub fn get_entry_zone(fvg: &FairValueGap, zone_percent: Decimal) -> (Decimal, Decimal) {
    let gap_size = fvg.gap_high - fvg.gap_low;
    let zone_size = gap_size * zone_percent;
    match fvg.direction {
        ZoneDirection::Bullish => (fvg.gap_low, fvg.gap_low + zone_size),
        ZoneDirection::Bearish => (fvg.gap_high - zone_size, fvg.gap_high),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UnixMillis;
    use crate::testing::helpers::ohlc_candle;
    use rust_decimal_macros::dec;

    fn candles() -> Vec<Candle> {
        vec![
            ohlc_candle("BTCUSDT", "1h", 0, dec!(100), dec!(101), dec!(99), dec!(100)),
            ohlc_candle("BTCUSDT", "1h", 1, dec!(100), dec!(105), dec!(100), dec!(104)),
            ohlc_candle("BTCUSDT", "1h", 2, dec!(104), dec!(110), dec!(103), dec!(108)),
        ]
    }

    #[test]
    fn detects_a_bullish_gap_above_threshold() {
        let fvgs = detect_bullish_fvg(&candles(), dec!(0.001));
        assert_eq!(fvgs.len(), 1);
        assert_eq!(fvgs[0].gap_low, dec!(101));
        assert_eq!(fvgs[0].gap_high, dec!(103));
    }

    #[test]
    fn rejects_a_gap_below_the_minimum_percent_threshold() {
        let fvgs = detect_bullish_fvg(&candles(), dec!(0.5));
        assert!(fvgs.is_empty());
    }

    #[test]
    fn entry_zone_sits_in_the_cheaper_half_of_a_bullish_gap() {
        let fvg = FairValueGap {
            direction: ZoneDirection::Bullish,
            gap_low: dec!(100),
            gap_high: dec!(110),
            formation_time: UnixMillis(0),
            formation_index: 0,
            status: ZoneStatus::Active,
            fill_percent: 0.0,
        };
        let (low, high) = get_entry_zone(&fvg, dec!(0.5));
        assert_eq!(low, dec!(100));
        assert_eq!(high, dec!(105));
    }
}
