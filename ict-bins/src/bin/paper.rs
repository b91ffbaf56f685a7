//! ICT strategy, paper execution mode: runs continuously against the
//! simulated gateway at a human-observable pace, until `--candles` bars
//! have been fed or the operator hits Ctrl-C. Useful for watching the
//! strategy's decisions play out in real time without real capital.

use anyhow::{Context, Result};
use clap::Parser;
use ict_bins::common::{build_config, build_strategy, drive_synthetic_feed, init_logging, install_shutdown_handler, EngineArgs};
use ict_core::audit::AuditLogger;
use ict_core::config::types::ExecutionMode;
use ict_core::config::ConfigValidator;
use ict_core::execution::simulated::SimulatedGateway;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let args = EngineArgs::parse();
    init_logging(&args.log_level)?;

    tracing::info!(symbol = %args.symbol, candles = args.candles, "=== ict-paper ===");

    let config = build_config(&args.symbol, args.profile.into(), ExecutionMode::Paper, args.audit, args.equity);
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

    let coordinator = Arc::new(ict_core::engine::TradeCoordinator::new(config.clone(), strategy, gateway, audit));
    coordinator.initialize_components().await.context("engine initialization failed")?;
    install_shutdown_handler(coordinator.clone())?;

    let bus = coordinator.bus().clone();
    let symbol = args.symbol.clone();
    let candles = args.candles;
    let feeder = tokio::spawn(async move {
        drive_synthetic_feed(&bus, &symbol, candles, rust_decimal_macros::dec!(50000), Some(Duration::from_millis(200))).await;
    });

    coordinator.run().await.context("engine run loop failed")?;
    feeder.await.context("synthetic feed task panicked")?;

    tracing::info!(open_positions = coordinator.positions().symbols().len(), "ict-paper finished");
    Ok(())
}
