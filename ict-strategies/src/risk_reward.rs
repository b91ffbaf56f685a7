//! A flat risk-reward take-profit: `TP = entry ± ratio * |entry - SL|`,
//! falling back to a flat percentage if the stop is degenerate (zero
//! distance from entry). Grounded on the reward-sizing arithmetic in
//! `_calculate_take_profit_with_buffer` in `src/strategies/ict_strategy.py`.

use ict_core::core::types::{ModuleRequirements, PositionSide};
use ict_core::strategy::{PriceContext, TakeProfitDeterminer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct RiskRewardTakeProfit {
    pub ratio: Decimal,
    pub fallback_percent: Decimal,
}

impl RiskRewardTakeProfit {
    pub fn new(ratio: Decimal) -> Self {
        Self { ratio, fallback_percent: dec!(0.02) }
    }
}

impl Default for RiskRewardTakeProfit {
    fn default() -> Self {
        Self::new(dec!(2))
    }
}

impl TakeProfitDeterminer for RiskRewardTakeProfit {
    fn name(&self) -> &str {
        "risk_reward"
    }

    fn requirements(&self) -> ModuleRequirements {
        ModuleRequirements::default()
    }

    fn compute(&self, ctx: &PriceContext, stop_loss: Decimal) -> Decimal {
        let entry = ctx.entry_price;
        let risk = (entry - stop_loss).abs();
        let reward = if risk.is_zero() { entry * self.fallback_percent } else { risk * self.ratio };
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
    use std::collections::HashMap;

    #[test]
    fn long_reward_scales_with_ratio() {
        let det = RiskRewardTakeProfit::new(dec!(2));
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Long,
            entry_price: dec!(100),
        };
        assert_eq!(det.compute(&ctx, dec!(95)), dec!(110));
    }

    #[test]
    fn degenerate_stop_falls_back_to_percent_reward() {
        let det = RiskRewardTakeProfit::default();
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Long,
            entry_price: dec!(100),
        };
        assert_eq!(det.compute(&ctx, dec!(100)), dec!(102));
    }
}
