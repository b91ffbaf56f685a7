//! ICT strategy, simulated execution mode: a bounded, backtest-free dry
//! run. Feeds `--candles` synthetic bars through the full pipeline as fast
//! as the engine can drain them, then exits and prints a summary. This is
//! not a backtesting harness (out of scope) — there is no P&L curve or
//! historical replay, just a deterministic smoke-run of the same code path
//! `ict-live`/`ict-paper` would run in production.

use anyhow::{Context, Result};
use clap::Parser;
use ict_bins::common::{build_config, build_strategy, drive_synthetic_feed, init_logging, EngineArgs};
use ict_core::audit::AuditLogger;
use ict_core::config::types::ExecutionMode;
use ict_core::config::ConfigValidator;
use ict_core::execution::simulated::SimulatedGateway;
use ict_core::engine::TradeCoordinator;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = EngineArgs::parse();
    init_logging(&args.log_level)?;

    tracing::info!(symbol = %args.symbol, candles = args.candles, "=== ict-simulated ===");

    let config = build_config(&args.symbol, args.profile.into(), ExecutionMode::Simulated, args.audit, args.equity);
    let report = ConfigValidator::check_deployment_readiness(&config);
    for issue in report.blockers.iter().chain(report.warnings.iter()) {
        tracing::warn!(field = %issue.field, level = ?issue.level, recommendation = %issue.recommendation, "{}", issue.message);
    }
    if !report.is_ready {
        anyhow::bail!("config is not deployment-ready; see the issues logged above");
    }

    let strategy = build_strategy(&config)?;
    let gateway = Arc::new(SimulatedGateway::new(args.equity));
    let audit = if args.audit {
        Some(Arc::new(AuditLogger::new(&config.audit.directory).context("opening audit log")?))
    } else {
        None
    };

    let coordinator = Arc::new(TradeCoordinator::new(config.clone(), strategy, gateway, audit));
    coordinator.initialize_components().await.context("engine initialization failed")?;

    let bus = coordinator.bus().clone();
    let symbol = args.symbol.clone();
    let candles = args.candles;
    let feeder = tokio::spawn(async move {
        drive_synthetic_feed(&bus, &symbol, candles, rust_decimal_macros::dec!(50000), None).await;
    });

    coordinator.run().await.context("engine run loop failed")?;
    feeder.await.context("synthetic feed task panicked")?;

    let open_symbols = coordinator.positions().symbols();
    tracing::info!(bars_fed = args.candles, open_positions = open_symbols.len(), "ict-simulated finished");
    for symbol in open_symbols {
        if let Some(position) = coordinator.positions().get(&symbol) {
            tracing::info!(%symbol, side = ?position.side, entry_price = %position.entry_price, quantity = %position.quantity, "open position at shutdown");
        }
    }

    Ok(())
}
