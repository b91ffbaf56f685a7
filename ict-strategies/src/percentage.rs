//! A flat percentage-of-entry stop-loss — the simplest determiner, and the
//! fallback every ICT zone-based determiner degrades to when no usable zone
//! is available. Grounded on the `percentage` stop-loss branch of
//! `_calculate_stop_loss_with_indicators` in `src/strategies/ict_strategy.py`.

use ict_core::core::types::{ModuleRequirements, PositionSide};
use ict_core::strategy::{PriceContext, StopLossDeterminer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct PercentageStopLoss {
    pub percent: Decimal,
}

impl PercentageStopLoss {
    pub fn new(percent: Decimal) -> Self {
        Self { percent }
    }
}

impl Default for PercentageStopLoss {
    fn default() -> Self {
        Self::new(dec!(0.01))
    }
}

impl StopLossDeterminer for PercentageStopLoss {
    fn name(&self) -> &str {
        "percentage"
    }

    fn requirements(&self) -> ModuleRequirements {
        ModuleRequirements::default()
    }

    fn compute(&self, ctx: &PriceContext) -> Decimal {
        match ctx.side {
            PositionSide::Long => ctx.entry_price * (Decimal::ONE - self.percent),
            PositionSide::Short => ctx.entry_price * (Decimal::ONE + self.percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::indicator_cache::IndicatorStateCache;
    use std::collections::HashMap;

    #[test]
    fn long_stop_sits_one_percent_below_entry() {
        let det = PercentageStopLoss::new(dec!(0.01));
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Long,
            entry_price: dec!(100),
        };
        assert_eq!(det.compute(&ctx), dec!(99));
    }

    #[test]
    fn short_stop_sits_above_entry() {
        let det = PercentageStopLoss::default();
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = PriceContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            side: PositionSide::Short,
            entry_price: dec!(100),
        };
        assert_eq!(det.compute(&ctx), dec!(101));
    }
}
