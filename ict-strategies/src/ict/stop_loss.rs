//! Zone-based stop-loss: places the stop just beyond the nearest FVG or
//! order block rather than a fixed percentage, falling back to a percentage
//! stop whenever no zone is available or the zone would put the stop on the
//! wrong side of entry. Grounded on
//! `src/strategies/ict/pricing/zone_based_sl.py`.

use ict_core::core::types::{ModuleRequirements, PositionSide, ZoneDirection};
use ict_core::ict::{detect_bearish_fvg, detect_bullish_fvg, find_nearest_fvg, find_nearest_ob, get_ob_zone, identify_bearish_ob, identify_bullish_ob};
use ict_core::strategy::{PriceContext, StopLossDeterminer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const STRUCTURE_WINDOW: usize = 50;

/// Places a stop beyond the nearest FVG (preferred) or order block, with a
/// small buffer past the zone edge, then clamps the resulting distance into
/// `[min_sl_percent, max_sl_percent]` of entry price.
pub struct ZoneBasedStopLoss {
    pub mtf_interval: String,
    pub fvg_min_gap_percent: Decimal,
    pub ob_min_strength: Decimal,
    pub buffer_percent: Decimal,
    pub fallback_percent: Decimal,
    pub min_sl_percent: Decimal,
    pub max_sl_percent: Decimal,
}

impl ZoneBasedStopLoss {
    pub fn new(mtf_interval: impl Into<String>, fvg_min_gap_percent: Decimal, ob_min_strength: Decimal) -> Self {
        Self {
            mtf_interval: mtf_interval.into(),
            fvg_min_gap_percent,
            ob_min_strength,
            buffer_percent: dec!(0.001),
            fallback_percent: dec!(0.01),
            min_sl_percent: dec!(0.005),
            max_sl_percent: dec!(0.02),
        }
    }

    fn fallback(&self, side: PositionSide, entry: Decimal) -> Decimal {
        match side {
            PositionSide::Long => entry * (Decimal::ONE - self.fallback_percent),
            PositionSide::Short => entry * (Decimal::ONE + self.fallback_percent),
        }
    }

    fn on_correct_side(&self, side: PositionSide, entry: Decimal, sl: Decimal) -> bool {
        match side {
            PositionSide::Long => sl < entry,
            PositionSide::Short => sl > entry,
        }
    }

    /// Clamp the stop's distance from entry into `[min_sl_percent,
    /// max_sl_percent]`, recomputing the price at whichever bound was
    /// crossed rather than merely rejecting it.
    fn apply_distance_bounds(&self, side: PositionSide, entry: Decimal, sl: Decimal) -> Decimal {
        if entry.is_zero() {
            return sl;
        }
        let distance_percent = (entry - sl).abs() / entry;
        let clamped = distance_percent.clamp(self.min_sl_percent, self.max_sl_percent);
        if clamped == distance_percent {
            return sl;
        }
        match side {
            PositionSide::Long => entry * (Decimal::ONE - clamped),
            PositionSide::Short => entry * (Decimal::ONE + clamped),
        }
    }
}

impl StopLossDeterminer for ZoneBasedStopLoss {
    fn name(&self) -> &str {
        "zone_based"
    }

    fn requirements(&self) -> ModuleRequirements {
        ModuleRequirements::single(self.mtf_interval.clone(), STRUCTURE_WINDOW)
    }

    fn compute(&self, ctx: &PriceContext) -> Decimal {
        let entry = ctx.entry_price;
        let Some(mtf) = ctx.base.candles.get(&self.mtf_interval) else {
            return self.fallback(ctx.side, entry);
        };
        let window_start = mtf.len().saturating_sub(STRUCTURE_WINDOW);
        let window = &mtf[window_start..];

        let zone_direction = match ctx.side {
            PositionSide::Long => ZoneDirection::Bullish,
            PositionSide::Short => ZoneDirection::Bearish,
        };
        let fvgs = match zone_direction {
            ZoneDirection::Bullish => detect_bullish_fvg(window, self.fvg_min_gap_percent),
            ZoneDirection::Bearish => detect_bearish_fvg(window, self.fvg_min_gap_percent),
        };
        let obs = match zone_direction {
            ZoneDirection::Bullish => identify_bullish_ob(window, self.ob_min_strength),
            ZoneDirection::Bearish => identify_bearish_ob(window, self.ob_min_strength),
        };

        let raw = if let Some(fvg) = find_nearest_fvg(&fvgs, entry, zone_direction, true) {
            match ctx.side {
                PositionSide::Long => fvg.gap_low - self.buffer_percent * entry,
                PositionSide::Short => fvg.gap_high + self.buffer_percent * entry,
            }
        } else if let Some(ob) = find_nearest_ob(&obs, entry, zone_direction, true) {
            let (low, high) = get_ob_zone(ob);
            match ctx.side {
                PositionSide::Long => low - self.buffer_percent * entry,
                PositionSide::Short => high + self.buffer_percent * entry,
            }
        } else {
            self.fallback(ctx.side, entry)
        };

        let sl = if self.on_correct_side(ctx.side, entry, raw) {
            raw
        } else {
            self.fallback(ctx.side, entry)
        };
        self.apply_distance_bounds(ctx.side, entry, sl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::indicator_cache::IndicatorStateCache;
    use ict_core::testing::helpers::ohlc_candle;
    use std::collections::HashMap;

    fn determiner() -> ZoneBasedStopLoss {
        ZoneBasedStopLoss::new("15m", dec!(0.0005), dec!(1.1))
    }

    #[test]
    fn falls_back_to_percentage_with_no_history() {
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Long,
            entry_price: dec!(100),
        };
        let sl = determiner().compute(&ctx);
        assert_eq!(sl, dec!(99));
    }

    #[test]
    fn stop_distance_never_exceeds_the_max_bound() {
        let d = determiner();
        let entry = dec!(100);
        let sl = d.apply_distance_bounds(PositionSide::Long, entry, dec!(50));
        assert_eq!(sl, entry * (Decimal::ONE - d.max_sl_percent));
    }

    #[test]
    fn stop_distance_never_falls_below_the_min_bound() {
        let d = determiner();
        let entry = dec!(100);
        let sl = d.apply_distance_bounds(PositionSide::Long, entry, dec!(99.9));
        assert_eq!(sl, entry * (Decimal::ONE - d.min_sl_percent));
    }

    #[test]
    fn long_stop_is_rejected_on_the_wrong_side_of_entry() {
        let d = determiner();
        assert!(!d.on_correct_side(PositionSide::Long, dec!(100), dec!(101)));
        assert!(d.on_correct_side(PositionSide::Long, dec!(100), dec!(99)));
    }

    #[test]
    fn flat_history_produces_a_zone_from_candles_and_still_respects_bounds() {
        let mut candles = HashMap::new();
        let buf: Vec<ict_core::core::types::Candle> = (0..60)
            .map(|i| ohlc_candle("BTCUSDT", "15m", i, dec!(100), dec!(100.1), dec!(99.9), dec!(100)))
            .collect();
        candles.insert("15m".to_string(), buf);
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Long,
            entry_price: dec!(100),
        };
        let sl = determiner().compute(&ctx);
        assert!(sl < dec!(100));
        let distance = (dec!(100) - sl) / dec!(100);
        assert!(distance >= dec!(0.005) && distance <= dec!(0.02));
    }
}
