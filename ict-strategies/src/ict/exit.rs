//! The ICT exit determiner: routes to one of four exit strategies —
//! trailing stop, breakeven, timed, or indicator-based reversal — per
//! `ICTExitDeterminer` in `src/exit/ict_exit.py`. The trailing-stop and
//! breakeven strategies are stateful across candles (a ratcheting stop
//! level per open position), mirroring that class's persistent
//! `self._trailing_levels` dict.

use ict_core::core::types::{ModuleRequirements, PositionSide, Trend};
use ict_core::ict::{detect_displacement, detect_inducement, get_current_trend};
use ict_core::strategy::{ExitContext, ExitDecision, ExitDeterminer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStrategy {
    TrailingStop,
    Breakeven,
    Timed,
    IndicatorBased,
}

#[derive(Debug, Clone, Copy)]
pub struct ExitConfig {
    pub strategy: ExitStrategy,
    /// `p_a`: unrealized gain (as a fraction of entry) that arms the trail.
    pub trail_activation_percent: Decimal,
    /// `p_d`: distance the trailing stop trails behind price.
    pub trail_distance_percent: Decimal,
    /// Gain (as a fraction of entry) that arms the breakeven stop.
    pub breakeven_offset_percent: Decimal,
    /// Max holding duration in milliseconds before a timed exit fires.
    pub timeout_ms: i64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            strategy: ExitStrategy::IndicatorBased,
            trail_activation_percent: dec!(0.01),
            trail_distance_percent: dec!(0.005),
            breakeven_offset_percent: dec!(0.005),
            timeout_ms: 24 * 60 * 60 * 1000,
        }
    }
}

const STRUCTURE_WINDOW: usize = 50;
const DISPLACEMENT_LOOKBACK: usize = 3;
const DISPLACEMENT_SCAN_BARS: usize = 10;

pub struct IctExitDeterminer {
    pub mtf_interval: String,
    pub htf_interval: String,
    pub swing_lookback: usize,
    pub displacement_ratio: Decimal,
    pub config: ExitConfig,
    /// Ratcheting stop level keyed `"{symbol}_{side:?}"`, shared across
    /// calls because a trailing or breakeven stop must never reset mid-trade.
    trailing_levels: Mutex<HashMap<String, Decimal>>,
}

impl IctExitDeterminer {
    pub fn new(mtf_interval: impl Into<String>, htf_interval: impl Into<String>, swing_lookback: usize, displacement_ratio: Decimal, config: ExitConfig) -> Self {
        Self {
            mtf_interval: mtf_interval.into(),
            htf_interval: htf_interval.into(),
            swing_lookback,
            displacement_ratio,
            config,
            trailing_levels: Mutex::new(HashMap::new()),
        }
    }

    fn level_key(symbol: &str, side: PositionSide) -> String {
        format!("{symbol}_{side:?}")
    }

    fn trailing_stop_exit(&self, ctx: &ExitContext) -> ExitDecision {
        let key = Self::level_key(&ctx.position.symbol, ctx.position.side);
        let entry = ctx.position.entry_price;
        let pd = self.config.trail_distance_percent;
        let pa = self.config.trail_activation_percent;
        let mut levels = self.trailing_levels.lock().expect("trailing level lock poisoned");

        match ctx.position.side {
            PositionSide::Long => {
                let initial = entry * (Decimal::ONE - pd);
                let current_stop = *levels.get(&key).unwrap_or(&initial);
                let mut stop = current_stop;
                if ctx.current_price > entry * (Decimal::ONE + pa) {
                    let candidate = ctx.current_price * (Decimal::ONE - pd);
                    if candidate > stop {
                        stop = candidate;
                    }
                }
                if ctx.current_price <= stop {
                    levels.remove(&key);
                    return ExitDecision::Exit { reason: "trailing_stop".to_string() };
                }
                levels.insert(key, stop);
            }
            PositionSide::Short => {
                let initial = entry * (Decimal::ONE + pd);
                let current_stop = *levels.get(&key).unwrap_or(&initial);
                let mut stop = current_stop;
                if ctx.current_price < entry * (Decimal::ONE - pa) {
                    let candidate = ctx.current_price * (Decimal::ONE + pd);
                    if candidate < stop {
                        stop = candidate;
                    }
                }
                if ctx.current_price >= stop {
                    levels.remove(&key);
                    return ExitDecision::Exit { reason: "trailing_stop".to_string() };
                }
                levels.insert(key, stop);
            }
        }
        ExitDecision::Hold
    }

    fn breakeven_exit(&self, ctx: &ExitContext) -> ExitDecision {
        let key = Self::level_key(&ctx.position.symbol, ctx.position.side);
        let entry = ctx.position.entry_price;
        if entry.is_zero() {
            return ExitDecision::Hold;
        }
        let pnl_percent = match ctx.position.side {
            PositionSide::Long => (ctx.current_price - entry) / entry,
            PositionSide::Short => (entry - ctx.current_price) / entry,
        };
        let mut levels = self.trailing_levels.lock().expect("trailing level lock poisoned");
        let armed = levels.contains_key(&key);
        if !armed {
            if pnl_percent > self.config.breakeven_offset_percent {
                levels.insert(key, entry);
            }
            return ExitDecision::Hold;
        }
        let crossed_back = match ctx.position.side {
            PositionSide::Long => ctx.current_price < entry,
            PositionSide::Short => ctx.current_price > entry,
        };
        if crossed_back {
            levels.remove(&key);
            return ExitDecision::Exit { reason: "breakeven".to_string() };
        }
        ExitDecision::Hold
    }

    fn timed_exit(&self, ctx: &ExitContext) -> ExitDecision {
        let Some(entry_time) = ctx.position.entry_time else {
            return ExitDecision::Hold;
        };
        let Some(now) = ctx.base.latest(&self.mtf_interval).map(|c| c.open_time) else {
            return ExitDecision::Hold;
        };
        if now.duration_since(entry_time) >= self.config.timeout_ms {
            return ExitDecision::Exit { reason: "timed".to_string() };
        }
        ExitDecision::Hold
    }

    fn indicator_based_exit(&self, ctx: &ExitContext) -> ExitDecision {
        let Some(mtf) = ctx.base.candles.get(&self.mtf_interval) else {
            return ExitDecision::Hold;
        };
        if mtf.is_empty() {
            return ExitDecision::Hold;
        }
        let htf = ctx.base.candles.get(&self.htf_interval).map(Vec::as_slice);

        // Trend reversal against the position.
        let trend = htf
            .and_then(|h| get_current_trend(h, self.swing_lookback, 2))
            .or_else(|| get_current_trend(mtf, self.swing_lookback, 2));
        let reversed = match (ctx.position.side, trend) {
            (PositionSide::Long, Some(Trend::Bearish)) => true,
            (PositionSide::Short, Some(Trend::Bullish)) => true,
            _ => false,
        };
        if reversed {
            return ExitDecision::Exit { reason: "trend_reversal".to_string() };
        }

        // Two or more displacements against the position within the scan window.
        let scan_start = mtf.len().saturating_sub(DISPLACEMENT_SCAN_BARS + DISPLACEMENT_LOOKBACK);
        let scan = &mtf[scan_start..];
        let adverse_direction = match ctx.position.side {
            PositionSide::Long => ict_core::core::types::ZoneDirection::Bearish,
            PositionSide::Short => ict_core::core::types::ZoneDirection::Bullish,
        };
        let mut adverse_displacements = 0;
        if scan.len() > DISPLACEMENT_LOOKBACK {
            for end in (DISPLACEMENT_LOOKBACK + 1)..=scan.len() {
                let window = &scan[end - DISPLACEMENT_LOOKBACK - 1..end];
                if let Some(d) = detect_displacement(window, DISPLACEMENT_LOOKBACK, self.displacement_ratio) {
                    if d.direction == adverse_direction {
                        adverse_displacements += 1;
                    }
                }
            }
        }
        if adverse_displacements >= 2 {
            return ExitDecision::Exit { reason: "adverse_displacement".to_string() };
        }

        // A fresh inducement against the position near the recent structural range.
        let window_start = mtf.len().saturating_sub(STRUCTURE_WINDOW);
        let window = &mtf[window_start..];
        let swing_high = window.iter().map(|c| c.high).max().unwrap_or(ctx.current_price);
        let swing_low = window.iter().map(|c| c.low).min().unwrap_or(ctx.current_price);
        let recent = &mtf[mtf.len().saturating_sub(DISPLACEMENT_LOOKBACK)..];
        let inducement = match ctx.position.side {
            PositionSide::Long => detect_inducement(recent, swing_high, true),
            PositionSide::Short => detect_inducement(recent, swing_low, false),
        };
        if inducement.is_some() {
            return ExitDecision::Exit { reason: "adverse_inducement".to_string() };
        }

        ExitDecision::Hold
    }
}

impl ExitDeterminer for IctExitDeterminer {
    fn name(&self) -> &str {
        "ict_exit"
    }

    fn requirements(&self) -> ModuleRequirements {
        ModuleRequirements::merge(&[
            ModuleRequirements::single(self.mtf_interval.clone(), STRUCTURE_WINDOW),
            ModuleRequirements::single(self.htf_interval.clone(), self.swing_lookback * 2 + 2),
        ])
    }

    fn decide(&self, ctx: &ExitContext) -> ExitDecision {
        match self.config.strategy {
            ExitStrategy::TrailingStop => self.trailing_stop_exit(ctx),
            ExitStrategy::Breakeven => self.breakeven_exit(ctx),
            ExitStrategy::Timed => self.timed_exit(ctx),
            ExitStrategy::IndicatorBased => self.indicator_based_exit(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::core::types::{Position, UnixMillis};
    use ict_core::indicator_cache::IndicatorStateCache;
    use ict_core::testing::helpers::ohlc_candle;
    use std::collections::HashMap;

    fn long_position(entry: Decimal) -> Position {
        Position {
            symbol: "BTCUSDT".to_string(),
            side: PositionSide::Long,
            entry_price: entry,
            quantity: dec!(1),
            leverage: dec!(5),
            unrealized_pnl: Decimal::ZERO,
            liquidation_price: None,
            entry_time: Some(UnixMillis(0)),
        }
    }

    #[test]
    fn trailing_stop_holds_before_activation() {
        let det = IctExitDeterminer::new("15m", "1h", 3, dec!(1.5), ExitConfig { strategy: ExitStrategy::TrailingStop, ..Default::default() });
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let position = long_position(dec!(100));
        let ctx = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(100.2),
        };
        assert!(matches!(det.decide(&ctx), ExitDecision::Hold));
    }

    #[test]
    fn trailing_stop_fires_once_price_falls_through_the_ratcheted_level() {
        let det = IctExitDeterminer::new("15m", "1h", 3, dec!(1.5), ExitConfig { strategy: ExitStrategy::TrailingStop, ..Default::default() });
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let position = long_position(dec!(100));

        // Activate the trail with a strong move up.
        let ctx1 = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(110),
        };
        assert!(matches!(det.decide(&ctx1), ExitDecision::Hold));

        // Price falls back through the ratcheted stop.
        let ctx2 = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(108),
        };
        assert!(matches!(det.decide(&ctx2), ExitDecision::Exit { .. }));
    }

    #[test]
    fn trailing_stop_fires_exactly_at_the_ratcheted_retrace_price() {
        let mut config = ExitConfig { strategy: ExitStrategy::TrailingStop, ..Default::default() };
        config.trail_activation_percent = dec!(0.01);
        config.trail_distance_percent = dec!(0.02);
        let det = IctExitDeterminer::new("15m", "1h", 3, dec!(1.5), config);
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let position = long_position(dec!(50000));

        let ctx1 = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(51000),
        };
        assert!(matches!(det.decide(&ctx1), ExitDecision::Hold));

        // Stop ratchets to 51000 * 0.98 = 49980; touching it exactly fires.
        let ctx2 = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(49980),
        };
        assert!(matches!(det.decide(&ctx2), ExitDecision::Exit { .. }));
    }

    #[test]
    fn breakeven_exits_on_crossback_after_arming() {
        let det = IctExitDeterminer::new("15m", "1h", 3, dec!(1.5), ExitConfig { strategy: ExitStrategy::Breakeven, ..Default::default() });
        let candles: HashMap<String, Vec<ict_core::core::types::Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let position = long_position(dec!(100));

        let ctx1 = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(101),
        };
        assert!(matches!(det.decide(&ctx1), ExitDecision::Hold));

        let ctx2 = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(99.5),
        };
        assert!(matches!(det.decide(&ctx2), ExitDecision::Exit { .. }));
    }

    #[test]
    fn timed_exit_fires_after_the_configured_timeout() {
        let det = IctExitDeterminer::new("15m", "1h", 3, dec!(1.5), ExitConfig { strategy: ExitStrategy::Timed, timeout_ms: 1000, ..Default::default() });
        let mut candles = HashMap::new();
        candles.insert("15m".to_string(), vec![ohlc_candle("BTCUSDT", "15m", 2000, dec!(100), dec!(100.1), dec!(99.9), dec!(100))]);
        let indicators = IndicatorStateCache::new(20, 15);
        let position = long_position(dec!(100));
        let ctx = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(100),
        };
        assert!(matches!(det.decide(&ctx), ExitDecision::Exit { .. }));
    }

    #[test]
    fn timed_exit_holds_before_the_timeout() {
        let det = IctExitDeterminer::new("15m", "1h", 3, dec!(1.5), ExitConfig { strategy: ExitStrategy::Timed, timeout_ms: 10_000, ..Default::default() });
        let mut candles = HashMap::new();
        candles.insert("15m".to_string(), vec![ohlc_candle("BTCUSDT", "15m", 2000, dec!(100), dec!(100.1), dec!(99.9), dec!(100))]);
        let indicators = IndicatorStateCache::new(20, 15);
        let position = long_position(dec!(100));
        let ctx = ExitContext {
            base: ict_core::strategy::StrategyContext { symbol: "BTCUSDT", candles: &candles, indicators: &indicators },
            position: &position,
            current_price: dec!(100),
        };
        assert!(matches!(det.decide(&ctx), ExitDecision::Hold));
    }
}
