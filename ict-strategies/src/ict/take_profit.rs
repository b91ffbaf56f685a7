//! Displacement-sized take-profit: reward is priced off whichever is
//! larger, the actual stop-loss distance or the most recent displacement
//! candle's range, so the realized R:R is never worse than the displacement
//! that justified the entry demands. Grounded on
//! `_calculate_take_profit_with_buffer` in `src/strategies/ict_strategy.py`.

use ict_core::core::types::ModuleRequirements;
use ict_core::ict::detect_displacement;
use ict_core::strategy::{PriceContext, TakeProfitDeterminer};
use ict_core::PositionSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const DISPLACEMENT_LOOKBACK: usize = 3;

pub struct DisplacementTakeProfit {
    pub mtf_interval: String,
    pub risk_reward_ratio: Decimal,
    pub displacement_ratio: Decimal,
    pub fallback_percent: Decimal,
}

impl DisplacementTakeProfit {
    pub fn new(mtf_interval: impl Into<String>, risk_reward_ratio: Decimal, displacement_ratio: Decimal) -> Self {
        Self {
            mtf_interval: mtf_interval.into(),
            risk_reward_ratio,
            displacement_ratio,
            fallback_percent: dec!(0.02),
        }
    }
}

impl TakeProfitDeterminer for DisplacementTakeProfit {
    fn name(&self) -> &str {
        "displacement"
    }

    fn requirements(&self) -> ModuleRequirements {
        ModuleRequirements::single(self.mtf_interval.clone(), DISPLACEMENT_LOOKBACK + 1)
    }

    fn compute(&self, ctx: &PriceContext, stop_loss: Decimal) -> Decimal {
        let entry = ctx.entry_price;
        let sl_distance = (entry - stop_loss).abs();

        let displacement_size = ctx
            .base
            .candles
            .get(&self.mtf_interval)
            .filter(|c| c.len() >= DISPLACEMENT_LOOKBACK + 1)
            .and_then(|candles| {
                let start = candles.len() - DISPLACEMENT_LOOKBACK - 1;
                detect_displacement(&candles[start..], DISPLACEMENT_LOOKBACK, self.displacement_ratio)
            })
            .map(|d| d.size);

        let fallback_distance = entry * self.fallback_percent;
        let reward_base = sl_distance.max(displacement_size.unwrap_or(fallback_distance));
        let reward = reward_base * self.risk_reward_ratio;

        match ctx.side {
            PositionSide::Long => entry + reward,
            PositionSide::Short => entry - reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::indicator_cache::IndicatorStateCache;
    use ict_core::testing::helpers::ohlc_candle;
    use std::collections::HashMap;

    fn determiner() -> DisplacementTakeProfit {
        DisplacementTakeProfit::new("15m", dec!(2), dec!(1.5))
    }

    #[test]
    fn falls_back_to_percent_reward_with_no_history() {
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Long,
            entry_price: dec!(100),
        };
        let tp = determiner().compute(&ctx, dec!(95));
        // sl_distance=5 > fallback 2% of 100=2, so reward_base=5, tp=100+5*2=110
        assert_eq!(tp, dec!(110));
    }

    #[test]
    fn never_promises_less_reward_than_risk_taken() {
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Short,
            entry_price: dec!(100),
        };
        let tp = determiner().compute(&ctx, dec!(101));
        let risk = dec!(1);
        assert!((dec!(100) - tp) >= risk * dec!(2));
    }

    #[test]
    fn flat_history_candles_do_not_panic() {
        let mut candles = HashMap::new();
        let buf: Vec<ict_core::core::types::Candle> = (0..5)
            .map(|i| ohlc_candle("BTCUSDT", "15m", i, dec!(100), dec!(100.1), dec!(99.9), dec!(100)))
            .collect();
        candles.insert("15m".to_string(), buf);
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Long,
            entry_price: dec!(100),
        };
        let _ = determiner().compute(&ctx, dec!(99));
    }
}
