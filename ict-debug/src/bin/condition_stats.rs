//! Dump condition-gate statistics for the ICT entry pipeline: run
//! [`ict_strategies::IctEntryDeterminer`] over a sliding window of
//! synthetic history and print how often each gate (kill zone, trend,
//! premium/discount zone, FVG/OB candidate, liquidity, inducement,
//! displacement) passed, plus how many signals it would have produced.

use anyhow::Result;
use clap::Parser;
use ict_core::config::types::StrategyProfile;
use ict_core::indicator_cache::IndicatorStateCache;
use ict_core::strategy::{EntryContext, EntryDeterminer, StrategyContext};
use ict_debug::common::synthetic_history;
use ict_strategies::{profile_config, IctEntryDeterminer};
use std::collections::HashMap;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(short, long, default_value = "BTCUSDT")]
    symbol: String,

    #[arg(long, value_enum, default_value = "balanced")]
    profile: CliProfile,

    /// Number of 15m bars to walk the entry pipeline over.
    #[arg(short, long, default_value = "300")]
    candles: usize,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliProfile {
    Strict,
    Balanced,
    Relaxed,
}

impl From<CliProfile> for StrategyProfile {
    fn from(value: CliProfile) -> Self {
        match value {
            CliProfile::Strict => StrategyProfile::Strict,
            CliProfile::Balanced => StrategyProfile::Balanced,
            CliProfile::Relaxed => StrategyProfile::Relaxed,
        }
    }
}

const MTF_INTERVAL: &str = "15m";
const HTF_INTERVAL: &str = "1h";
const MIN_WINDOW: usize = 60;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let config = profile_config(args.profile.into());
    let mtf_history = synthetic_history(&args.symbol, MTF_INTERVAL, args.candles);
    let htf_history = synthetic_history(&args.symbol, HTF_INTERVAL, args.candles / 4 + 1);

    let determiner = IctEntryDeterminer::new(
        MTF_INTERVAL,
        HTF_INTERVAL,
        config.swing_lookback,
        config.displacement_ratio,
        config.fvg_min_gap_percent,
        config.ob_min_strength,
        config.liquidity_tolerance,
        config.use_killzones,
    );
    let indicators = IndicatorStateCache::new(config.max_order_blocks, config.max_fair_value_gaps);

    for end in MIN_WINDOW..=mtf_history.len() {
        let mut candles = HashMap::new();
        candles.insert(MTF_INTERVAL.to_string(), mtf_history[..end].to_vec());
        candles.insert(HTF_INTERVAL.to_string(), htf_history[..(end / 4 + 1).min(htf_history.len())].to_vec());

        let ctx = EntryContext {
            base: StrategyContext { symbol: &args.symbol, candles: &candles, indicators: &indicators },
        };
        let _ = determiner.decide(&ctx);
    }

    let snapshot = determiner.get_condition_stats();
    println!("symbol={} profile={:?} windows_checked={}", args.symbol, config.profile, snapshot.total_checks);
    println!("killzone_ok:        {}", snapshot.killzone_ok);
    println!("trend_ok:           {}", snapshot.trend_ok);
    println!("zone_ok:            {}", snapshot.zone_ok);
    println!("fvg_ob_ok:          {}", snapshot.fvg_ob_ok);
    println!("liquidity_ok:       {}", snapshot.liquidity_ok);
    println!("inducement_ok:      {}", snapshot.inducement_ok);
    println!("displacement_ok:    {}", snapshot.displacement_ok);
    println!("all_conditions_ok:  {}", snapshot.all_conditions_ok);
    println!("signals_generated:  {}", snapshot.signals_generated);

    Ok(())
}
