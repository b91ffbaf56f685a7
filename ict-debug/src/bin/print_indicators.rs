//! Print the active order blocks and fair value gaps the ICT detectors
//! would currently be tracking for a symbol, given a synthetic candle
//! history (there is no persisted history to read — see `common.rs`).

use anyhow::Result;
use clap::Parser;
use ict_core::config::types::StrategyProfile;
use ict_core::ict::{detect_bearish_fvg, detect_bullish_fvg, identify_bearish_ob, identify_bullish_ob};
use ict_core::indicator_cache::IndicatorStateCache;
use ict_debug::common::synthetic_history;
use ict_strategies::profile_config;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(short, long, default_value = "BTCUSDT")]
    symbol: String,

    #[arg(short, long, default_value = "15m")]
    interval: String,

    #[arg(short, long, default_value = "120")]
    candles: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let config = profile_config(StrategyProfile::Balanced);
    let history = synthetic_history(&args.symbol, &args.interval, args.candles);

    let mut order_blocks = identify_bullish_ob(&history, config.ob_min_strength);
    order_blocks.extend(identify_bearish_ob(&history, config.ob_min_strength));
    let mut fvgs = detect_bullish_fvg(&history, config.fvg_min_gap_percent);
    fvgs.extend(detect_bearish_fvg(&history, config.fvg_min_gap_percent));

    let cache = IndicatorStateCache::new(config.max_order_blocks, config.max_fair_value_gaps);
    cache.initialize_from_history(&args.symbol, &args.interval, order_blocks, fvgs);

    let active_obs = cache.get_active_order_blocks(&args.symbol, &args.interval);
    let active_fvgs = cache.get_active_fair_value_gaps(&args.symbol, &args.interval);

    println!("symbol={} interval={} candles={}", args.symbol, args.interval, args.candles);
    println!("--- active order blocks ({}) ---", active_obs.len());
    println!("{}", serde_json::to_string_pretty(&active_obs)?);
    println!("--- active fair value gaps ({}) ---", active_fvgs.len());
    println!("{}", serde_json::to_string_pretty(&active_fvgs)?);

    Ok(())
}
