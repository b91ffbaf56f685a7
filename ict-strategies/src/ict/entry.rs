//! The ICT entry determiner: a ten-gate pipeline from kill zone through
//! displacement confirmation to a directional entry decision. Grounded on
//! `ICTStrategy.analyze()` in `src/strategies/ict_strategy.py`, including
//! its `condition_stats` counters.

use ict_core::core::types::{Candle, ModuleRequirements, PositionSide, Trend, ZoneDirection};
use ict_core::ict::{
    detect_bearish_fvg, detect_bullish_fvg, detect_displacement, detect_inducement, find_equal_highs,
    find_equal_lows, find_nearest_fvg, find_nearest_ob, get_active_killzone, get_current_trend,
    identify_bearish_ob, identify_bullish_ob, is_in_discount, is_in_premium,
};
use ict_core::strategy::{EntryContext, EntryDecision, EntryDeterminer};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Width of the window (in candles) the entry pipeline looks back over when
/// searching for a premium/discount range, liquidity pools, inducement, and
/// displacement.
const STRUCTURE_WINDOW: usize = 50;
/// How many trailing candles count as "recent" for inducement confirmation.
const RECENT_BARS: usize = 3;
/// Lookback `detect_displacement` averages against when judging the final
/// candle's range.
const DISPLACEMENT_LOOKBACK: usize = 3;

/// Running counters for each gate of the entry pipeline, exposed via
/// [`IctEntryDeterminer::get_condition_stats`]. Atomics rather than a
/// `Mutex<struct>` since `decide` only ever increments, never reads back a
/// consistent multi-field snapshot mid-flight.
#[derive(Debug, Default)]
pub struct ConditionStats {
    pub total_checks: AtomicU64,
    pub killzone_ok: AtomicU64,
    pub trend_ok: AtomicU64,
    pub zone_ok: AtomicU64,
    pub fvg_ob_ok: AtomicU64,
    pub liquidity_ok: AtomicU64,
    pub inducement_ok: AtomicU64,
    pub displacement_ok: AtomicU64,
    pub all_conditions_ok: AtomicU64,
    pub signals_generated: AtomicU64,
}

/// Point-in-time read of [`ConditionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionStatsSnapshot {
    pub total_checks: u64,
    pub killzone_ok: u64,
    pub trend_ok: u64,
    pub zone_ok: u64,
    pub fvg_ob_ok: u64,
    pub liquidity_ok: u64,
    pub inducement_ok: u64,
    pub displacement_ok: u64,
    pub all_conditions_ok: u64,
    pub signals_generated: u64,
}

impl ConditionStats {
    fn snapshot(&self) -> ConditionStatsSnapshot {
        ConditionStatsSnapshot {
            total_checks: self.total_checks.load(Ordering::Relaxed),
            killzone_ok: self.killzone_ok.load(Ordering::Relaxed),
            trend_ok: self.trend_ok.load(Ordering::Relaxed),
            zone_ok: self.zone_ok.load(Ordering::Relaxed),
            fvg_ob_ok: self.fvg_ob_ok.load(Ordering::Relaxed),
            liquidity_ok: self.liquidity_ok.load(Ordering::Relaxed),
            inducement_ok: self.inducement_ok.load(Ordering::Relaxed),
            displacement_ok: self.displacement_ok.load(Ordering::Relaxed),
            all_conditions_ok: self.all_conditions_ok.load(Ordering::Relaxed),
            signals_generated: self.signals_generated.load(Ordering::Relaxed),
        }
    }
}

/// Composable entry determiner implementing the full ICT confluence stack:
/// kill zone, HTF/MTF trend, premium/discount zoning, FVG/OB candidates,
/// liquidity, inducement, and displacement confirmation.
pub struct IctEntryDeterminer {
    pub mtf_interval: String,
    pub htf_interval: String,
    pub swing_lookback: usize,
    pub displacement_ratio: Decimal,
    pub fvg_min_gap_percent: Decimal,
    pub ob_min_strength: Decimal,
    pub liquidity_tolerance: Decimal,
    pub use_killzones: bool,
    stats: ConditionStats,
    /// Monotonic per-closed-candle counter, passed to the indicator cache
    /// as its expiry clock so pushes stay stable across windows that grow
    /// and evict as the underlying ring buffer fills.
    candle_index: AtomicUsize,
}

impl IctEntryDeterminer {
    pub fn new(
        mtf_interval: impl Into<String>,
        htf_interval: impl Into<String>,
        swing_lookback: usize,
        displacement_ratio: Decimal,
        fvg_min_gap_percent: Decimal,
        ob_min_strength: Decimal,
        liquidity_tolerance: Decimal,
        use_killzones: bool,
    ) -> Self {
        Self {
            mtf_interval: mtf_interval.into(),
            htf_interval: htf_interval.into(),
            swing_lookback,
            displacement_ratio,
            fvg_min_gap_percent,
            ob_min_strength,
            liquidity_tolerance,
            use_killzones,
            stats: ConditionStats::default(),
            candle_index: AtomicUsize::new(0),
        }
    }

    pub fn get_condition_stats(&self) -> ConditionStatsSnapshot {
        self.stats.snapshot()
    }

    /// HTF trend if there's enough HTF history to resolve one, else a trend
    /// recomputed from the MTF buffer. `None` (ambiguous/insufficient data)
    /// is treated the same as `Trend::Sideways` — abort, never guess.
    fn resolve_trend(&self, htf: Option<&[Candle]>, mtf: &[Candle]) -> Option<Trend> {
        if let Some(htf) = htf {
            if let Some(trend) = get_current_trend(htf, self.swing_lookback, 2) {
                return Some(trend);
            }
        }
        get_current_trend(mtf, self.swing_lookback, 2)
    }

    /// Detects whatever FVG/OB this closed candle newly confirms (the last
    /// 2-3 candles of `mtf` are the only window that can produce a zone
    /// confirmed as of *this* bar) and folds it into the shared indicator
    /// cache, instead of rescanning the whole structural window every call.
    fn sync_indicator_cache(&self, ctx: &EntryContext, mtf: &[Candle]) {
        let idx = self.candle_index.fetch_add(1, Ordering::Relaxed);
        let current = mtf.last().expect("checked non-empty by caller");

        if mtf.len() >= 3 {
            let tail = &mtf[mtf.len() - 3..];
            for fvg in detect_bullish_fvg(tail, self.fvg_min_gap_percent) {
                ctx.base.indicators.push_fair_value_gap(ctx.base.symbol, &self.mtf_interval, fvg, idx);
            }
            for fvg in detect_bearish_fvg(tail, self.fvg_min_gap_percent) {
                ctx.base.indicators.push_fair_value_gap(ctx.base.symbol, &self.mtf_interval, fvg, idx);
            }
        }
        if mtf.len() >= 2 {
            let tail = &mtf[mtf.len() - 2..];
            for ob in identify_bullish_ob(tail, self.ob_min_strength) {
                ctx.base.indicators.push_order_block(ctx.base.symbol, &self.mtf_interval, ob, idx);
            }
            for ob in identify_bearish_ob(tail, self.ob_min_strength) {
                ctx.base.indicators.push_order_block(ctx.base.symbol, &self.mtf_interval, ob, idx);
            }
        }
        ctx.base.indicators.update_statuses(ctx.base.symbol, &self.mtf_interval, current, idx);
    }
}

impl EntryDeterminer for IctEntryDeterminer {
    fn name(&self) -> &str {
        "ict_entry"
    }

    fn requirements(&self) -> ModuleRequirements {
        ModuleRequirements::merge(&[
            ModuleRequirements::single(self.mtf_interval.clone(), STRUCTURE_WINDOW + RECENT_BARS),
            ModuleRequirements::single(self.htf_interval.clone(), self.swing_lookback * 2 + 2),
        ])
    }

    fn decide(&self, ctx: &EntryContext) -> EntryDecision {
        self.stats.total_checks.fetch_add(1, Ordering::Relaxed);

        let Some(mtf) = ctx.base.candles.get(&self.mtf_interval) else {
            return EntryDecision::NoEntry;
        };
        if mtf.len() < RECENT_BARS + 2 || mtf.len() < DISPLACEMENT_LOOKBACK + 1 {
            return EntryDecision::NoEntry;
        }
        let htf = ctx.base.candles.get(&self.htf_interval).map(Vec::as_slice);
        let current = mtf.last().expect("checked non-empty above");

        self.sync_indicator_cache(ctx, mtf);

        // Gate 1: kill zone.
        if self.use_killzones {
            let Some(ts) = chrono::DateTime::from_timestamp_millis(current.close_time.0) else {
                return EntryDecision::NoEntry;
            };
            if get_active_killzone(ts).is_none() {
                return EntryDecision::NoEntry;
            }
        }
        self.stats.killzone_ok.fetch_add(1, Ordering::Relaxed);

        // Gate 2: trend. Sideways/ambiguous aborts.
        let Some(trend) = self.resolve_trend(htf, mtf) else {
            return EntryDecision::NoEntry;
        };
        let side = match trend {
            Trend::Bullish => PositionSide::Long,
            Trend::Bearish => PositionSide::Short,
            Trend::Sideways => return EntryDecision::NoEntry,
        };
        self.stats.trend_ok.fetch_add(1, Ordering::Relaxed);

        // Gate 3: premium/discount zone over the last structural window.
        let window_start = mtf.len().saturating_sub(STRUCTURE_WINDOW);
        let window = &mtf[window_start..];
        let swing_high = window.iter().map(|c| c.high).max().unwrap_or(current.close);
        let swing_low = window.iter().map(|c| c.low).min().unwrap_or(current.close);
        let in_favorable_zone = match side {
            PositionSide::Long => is_in_discount(current.close, swing_high, swing_low),
            PositionSide::Short => is_in_premium(current.close, swing_high, swing_low),
        };
        if !in_favorable_zone {
            return EntryDecision::NoEntry;
        }
        self.stats.zone_ok.fetch_add(1, Ordering::Relaxed);

        // Gate 4: FVG/OB candidates matching trade direction.
        let zone_direction = match side {
            PositionSide::Long => ZoneDirection::Bullish,
            PositionSide::Short => ZoneDirection::Bearish,
        };
        let fvgs = ctx.base.indicators.get_active_fair_value_gaps(ctx.base.symbol, &self.mtf_interval);
        let obs = ctx.base.indicators.get_active_order_blocks(ctx.base.symbol, &self.mtf_interval);
        let nearest_fvg = find_nearest_fvg(&fvgs, current.close, zone_direction, true);
        let nearest_ob = find_nearest_ob(&obs, current.close, zone_direction, true);
        if nearest_fvg.is_none() && nearest_ob.is_none() {
            return EntryDecision::NoEntry;
        }
        self.stats.fvg_ob_ok.fetch_add(1, Ordering::Relaxed);

        // Gate 5: liquidity — a pool on the opposite side of price to draw
        // the move toward once the entry triggers.
        let has_liquidity = match side {
            PositionSide::Long => !find_equal_highs(window, self.liquidity_tolerance).is_empty(),
            PositionSide::Short => !find_equal_lows(window, self.liquidity_tolerance).is_empty(),
        };
        if !has_liquidity {
            return EntryDecision::NoEntry;
        }
        self.stats.liquidity_ok.fetch_add(1, Ordering::Relaxed);

        // Gate 6: inducement — a recent opposite-direction fake sweep of the
        // structural swing just before the real move.
        let recent = &mtf[mtf.len().saturating_sub(RECENT_BARS)..];
        let inducement = match side {
            PositionSide::Long => detect_inducement(recent, swing_low, false),
            PositionSide::Short => detect_inducement(recent, swing_high, true),
        };
        if inducement.is_none() {
            return EntryDecision::NoEntry;
        }
        self.stats.inducement_ok.fetch_add(1, Ordering::Relaxed);

        // Gate 7: displacement in the trade direction on the latest candle.
        let dwindow_start = mtf.len().saturating_sub(DISPLACEMENT_LOOKBACK + 1);
        let Some(displacement) = detect_displacement(&mtf[dwindow_start..], DISPLACEMENT_LOOKBACK, self.displacement_ratio)
        else {
            return EntryDecision::NoEntry;
        };
        if displacement.direction != zone_direction {
            return EntryDecision::NoEntry;
        }
        self.stats.displacement_ok.fetch_add(1, Ordering::Relaxed);

        // Gate 8: entry timing — price has actually mitigated into the
        // nearest zone rather than merely approaching it.
        let mitigated = nearest_fvg.map(|f| f.contains(current.close)).unwrap_or(false)
            || nearest_ob.map(|o| o.contains(current.close)).unwrap_or(false);
        if !mitigated {
            return EntryDecision::NoEntry;
        }

        self.stats.all_conditions_ok.fetch_add(1, Ordering::Relaxed);
        self.stats.signals_generated.fetch_add(1, Ordering::Relaxed);

        EntryDecision::Enter {
            side,
            entry_price: current.close,
            confidence: 0.75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::indicator_cache::IndicatorStateCache;
    use ict_core::testing::helpers::ohlc_candle;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn determiner() -> IctEntryDeterminer {
        IctEntryDeterminer::new("15m", "1h", 3, dec!(1.1), dec!(0.0005), dec!(1.1), dec!(0.005), false)
    }

    #[test]
    fn no_entry_on_an_empty_buffer() {
        let candles: HashMap<String, Vec<Candle>> = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = EntryContext {
            base: ict_core::strategy::StrategyContext {
                symbol: "BTCUSDT",
                candles: &candles,
                indicators: &indicators,
            },
        };
        assert!(matches!(determiner().decide(&ctx), EntryDecision::NoEntry));
    }

    #[test]
    fn requirements_cover_both_timeframes() {
        let reqs = determiner().requirements();
        assert!(reqs.min_candles.contains_key("15m"));
        assert!(reqs.min_candles.contains_key("1h"));
    }

    #[test]
    fn stats_start_at_zero() {
        let d = determiner();
        let snap = d.get_condition_stats();
        assert_eq!(snap.total_checks, 0);
        assert_eq!(snap.signals_generated, 0);
    }

    #[test]
    fn flat_history_never_triggers_a_signal() {
        let mut candles = HashMap::new();
        let flat: Vec<Candle> = (0..10)
            .map(|i| ohlc_candle("BTCUSDT", "15m", i, dec!(100), dec!(100.1), dec!(99.9), dec!(100)))
            .collect();
        candles.insert("15m".to_string(), flat);
        let indicators = IndicatorStateCache::new(20, 15);
        let ctx = EntryContext {
            base: ict_core::strategy::StrategyContext {
                symbol: "BTCUSDT",
                candles: &candles,
                indicators: &indicators,
            },
        };
        assert!(matches!(determiner().decide(&ctx), EntryDecision::NoEntry));
    }
}
