//! Common utilities for the `ict-bins` binaries: CLI parsing, logging
//! setup, config/strategy assembly, and the synthetic candle feed that
//! drives the engine when no real exchange market-data client is wired in
//! (a concrete exchange wire client is out of scope here).

use anyhow::{Context, Result};
use clap::Parser;
use ict_core::config::types::{
    AuditConfig, BusConfig, Config, ExecutionConfig, ExecutionMode, LiquidationConfig, LoggingConfig, SymbolConfig,
};
use ict_core::config::types::StrategyProfile;
use ict_core::core::types::{Candle, Event, EventKind, UnixMillis};
use ict_core::bus::EventBus;
use ict_core::engine::TradeCoordinator;
use ict_core::risk::types::RiskLimits;
use ict_core::strategy::ComposableStrategy;
use ict_strategies::{profile_config, StrategyModuleRegistry};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Strictness preset, exposed on the CLI as a plain string so none of the
/// three binaries need to depend on `clap`'s `ValueEnum` derive for a type
/// that lives in `ict-core`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliProfile {
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

/// Common CLI arguments shared by every `ict-bins` binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct EngineArgs {
    /// Symbol to trade.
    #[arg(short, long, default_value = "BTCUSDT")]
    pub symbol: String,

    /// Entry-confluence strictness preset.
    #[arg(long, value_enum, default_value = "balanced")]
    pub profile: CliProfile,

    /// Starting account equity for the simulated gateway.
    #[arg(long, default_value = "10000")]
    pub equity: Decimal,

    /// Number of synthetic 15m candles to feed through the engine.
    #[arg(long, default_value = "200")]
    pub candles: usize,

    /// Write every engine decision to the audit log under `logs/audit`.
    #[arg(long)]
    pub audit: bool,

    /// Log level (overridden by `RUST_LOG` if set).
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Initialize structured logging. `RUST_LOG` takes precedence over
/// `--log-level` so an operator can raise verbosity for one module without
/// a redeploy.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
    Ok(())
}

/// Assemble a single-symbol [`Config`] from CLI arguments. Filter values
/// (lot size, tick size, min notional) are placeholders representative of a
/// liquid perpetual; a real deployment would source these from the
/// exchange's symbol metadata, which this system does not fetch (the
/// exchange wire client is out of scope).
pub fn build_config(symbol: &str, profile: StrategyProfile, mode: ExecutionMode, audit: bool, starting_equity: Decimal) -> Config {
    Config {
        symbols: vec![SymbolConfig {
            symbol: symbol.to_string(),
            extra_intervals: vec![],
            lot_size: dec!(0.001),
            tick_size: dec!(0.01),
            min_notional: dec!(5),
            max_leverage: dec!(5),
        }],
        risk: RiskLimits::default(),
        execution: ExecutionConfig {
            mode,
            order_confirmation_timeout_ms: 5000,
            starting_equity: Some(starting_equity),
        },
        strategy: profile_config(profile),
        bus: BusConfig::default(),
        logging: LoggingConfig { level: "info".to_string(), json: true },
        audit: AuditConfig { enabled: audit, directory: "logs/audit".to_string() },
        liquidation: LiquidationConfig::default(),
        testnet: !matches!(mode, ExecutionMode::Live),
    }
}

/// Build the one composable strategy this system ships: the full ICT entry
/// pipeline, a zone-based stop, a displacement-scaled take-profit, and the
/// indicator-based exit. Other determiner combinations are reachable
/// through [`StrategyModuleRegistry`] directly; the binaries standardize on
/// this combination as the "house" strategy.
pub fn build_strategy(config: &Config) -> Result<ComposableStrategy> {
    StrategyModuleRegistry::global()
        .build_strategy("ict_house", "ict_entry", "zone_based", "displacement", "ict_exit", &config.strategy)
        .ok_or_else(|| anyhow::anyhow!("a registered determiner name was missing from the module registry"))
}

/// Install a Ctrl-C handler that requests a graceful shutdown instead of
/// killing the process — the engine still drains its queues and runs the
/// liquidation protocol on the way down.
pub fn install_shutdown_handler(coordinator: Arc<TradeCoordinator>) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::warn!("shutdown requested (ctrl-c)");
        coordinator.request_shutdown();
    })
    .context("failed to install ctrl-c handler")
}

const FIFTEEN_MIN_MS: i64 = 15 * 60 * 1000;
const ONE_HOUR_MS: i64 = 60 * 60 * 1000;

/// A deterministic, float-free price walk. Not a market-data client (out of
/// scope) — just enough synthetic history for the full candle-closed →
/// entry/exit → risk → simulated-fill pipeline to actually run.
fn synthetic_candle(symbol: &str, interval: &str, index: u64, interval_ms: i64, base_price: Decimal) -> Candle {
    let offset = Decimal::from((index % 21) as i64 - 10) * dec!(5);
    let drift = Decimal::from((index % 7) as i64 - 3) * dec!(2);
    let open = base_price + offset;
    let close = open + drift;
    let high = open.max(close) + dec!(3);
    let low = open.min(close) - dec!(3);
    let open_time = UnixMillis::new(index as i64 * interval_ms);
    let close_time = UnixMillis::new(open_time.0 + interval_ms);
    Candle::new(symbol, interval, open_time, close_time, open, high, low, close, dec!(12), true)
        .expect("synthetic candle satisfies its own OHLC bounds by construction")
}

/// Push `candles` closed 15m bars (with a 1h bar closing every fourth one,
/// matching the strategy's multi-timeframe requirement) onto the bus, then
/// request shutdown. `pace` sleeps between bars when set, so `ict-paper`
/// can run at a human-observable cadence instead of bursting through the
/// whole history in microseconds.
pub async fn drive_synthetic_feed(bus: &EventBus, symbol: &str, candles: usize, base_price: Decimal, pace: Option<Duration>) {
    for i in 0..candles as u64 {
        let m15 = synthetic_candle(symbol, "15m", i, FIFTEEN_MIN_MS, base_price);
        bus.publish(Event::new(EventKind::CandleClosed(m15)));

        if i % 4 == 0 {
            let h1 = synthetic_candle(symbol, "1h", i / 4, ONE_HOUR_MS, base_price);
            bus.publish(Event::new(EventKind::CandleClosed(h1)));
        }

        if let Some(delay) = pace {
            tokio::time::sleep(delay).await;
        }
    }
    tracing::info!(candles, "synthetic feed exhausted, requesting shutdown");
    bus.request_shutdown();
}
