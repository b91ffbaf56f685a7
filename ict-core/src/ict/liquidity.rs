//! Liquidity pools (equal highs/lows) and premium/discount zoning relative
//! to a swing range. Grounded on the `src.detectors.ict_liquidity` import
//! list in `ict_entry.py` and the package test's
//! `strategies.ict.detectors.liquidity` surface; the implementation itself
//! was not retrieved, so the equal-high/low tolerance and 50%-midpoint
//! premium/discount split follow the ICT definitions the rest of this
//! package already encodes (swing range midpoint, `liquidity_tolerance` as
//! a percent-of-price band).

use crate::core::types::Candle;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityLevel {
    pub price: Decimal,
    pub first_index: usize,
    pub second_index: usize,
}

/// Two swing highs within `tolerance_percent` of each other — a resting
/// pool of buy-stops above the market.
pub fn find_equal_highs(candles: &[Candle], tolerance_percent: Decimal) -> Vec<LiquidityLevel> {
    equal_levels(candles, tolerance_percent, true)
}

/// Two swing lows within `tolerance_percent` of each other — a resting
/// pool of sell-stops below the market.
pub fn find_equal_lows(candles: &[Candle], tolerance_percent: Decimal) -> Vec<LiquidityLevel> {
    equal_levels(candles, tolerance_percent, false)
}

fn equal_levels(candles: &[Candle], tolerance_percent: Decimal, highs: bool) -> Vec<LiquidityLevel> {
    let mut out = Vec::new();
    if candles.len() < 2 {
        return out;
    }
    for i in 0..candles.len() {
        for j in i + 1..candles.len() {
            let (a, b) = if highs { (candles[i].high, candles[j].high) } else { (candles[i].low, candles[j].low) };
            if a.is_zero() {
                continue;
            }
            let diff_percent = (a - b).abs() / a;
            if diff_percent <= tolerance_percent {
                out.push(LiquidityLevel { price: (a + b) / Decimal::TWO, first_index: i, second_index: j });
            }
        }
    }
    out
}

/// Swing-range midpoint: the dividing line between premium (sell zone) and
/// discount (buy zone), per ICT's "50% of the range" convention.
pub fn calculate_premium_discount(swing_high: Decimal, swing_low: Decimal) -> Decimal {
    (swing_high + swing_low) / Decimal::TWO
}

/// Price trading in the upper half of the range — favorable for selling.
pub fn is_in_premium(price: Decimal, swing_high: Decimal, swing_low: Decimal) -> bool {
    price > calculate_premium_discount(swing_high, swing_low)
}

/// Price trading in the lower half of the range — favorable for buying.
pub fn is_in_discount(price: Decimal, swing_high: Decimal, swing_low: Decimal) -> bool {
    price < calculate_premium_discount(swing_high, swing_low)
}

/// A liquidity sweep: a candle wicks through a resting level and closes
/// back on the other side of it — stops run, then price reverses.
pub fn detect_liquidity_sweep(candles: &[Candle], level: Decimal, above: bool) -> bool {
    candles.iter().any(|c| {
        if above {
            c.high > level && c.close < level
        } else {
            c.low < level && c.close > level
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::helpers::ohlc_candle;
    use rust_decimal_macros::dec;

    #[test]
    fn finds_equal_highs_within_tolerance() {
        let candles = vec![
            ohlc_candle("BTCUSDT", "1h", 0, dec!(100), dec!(110), dec!(99), dec!(105)),
            ohlc_candle("BTCUSDT", "1h", 1, dec!(105), dec!(104), dec!(100), dec!(102)),
            ohlc_candle("BTCUSDT", "1h", 2, dec!(102), dec!(110.05), dec!(101), dec!(108)),
        ];
        let levels = find_equal_highs(&candles, dec!(0.001));
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn premium_discount_split_at_the_midpoint() {
        let high = dec!(110);
        let low = dec!(100);
        assert_eq!(calculate_premium_discount(high, low), dec!(105));
        assert!(is_in_premium(dec!(108), high, low));
        assert!(is_in_discount(dec!(102), high, low));
    }

    #[test]
    fn sweep_above_requires_a_wick_through_and_close_back_below() {
        let candles = vec![ohlc_candle("BTCUSDT", "1h", 0, dec!(100), dec!(112), dec!(99), dec!(101))];
        assert!(detect_liquidity_sweep(&candles, dec!(110), true));
        assert!(!detect_liquidity_sweep(&candles, dec!(120), true));
    }
}
