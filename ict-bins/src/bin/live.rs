//! ICT strategy, live execution mode.
//!
//! This binary wires a real config and a real `ComposableStrategy` exactly
//! like `ict-paper` and `ict-simulated` do, then stops short of running it:
//! live execution needs a gateway that actually talks to an exchange, and a
//! market-data client that actually streams candles, and neither is wired
//! in here. Use `ict-paper` for a continuous run or `ict-simulated` for a
//! bounded one.

use anyhow::Result;
use clap::Parser;
use ict_bins::common::{build_config, build_strategy, init_logging, EngineArgs};
use ict_core::config::types::ExecutionMode;
use ict_core::config::ConfigValidator;

fn main() -> Result<()> {
    let args = EngineArgs::parse();
    init_logging(&args.log_level)?;

    tracing::info!(symbol = %args.symbol, "=== ict-live ===");
    tracing::warn!("LIVE TRADING MODE would place real orders on a real exchange");

    let config = build_config(&args.symbol, args.profile.into(), ExecutionMode::Live, args.audit, args.equity);
    let report = ConfigValidator::check_deployment_readiness(&config);
    for issue in report.blockers.iter().chain(report.warnings.iter()) {
        tracing::warn!(field = %issue.field, level = ?issue.level, recommendation = %issue.recommendation, "{}", issue.message);
    }
    if !report.is_ready {
        anyhow::bail!("config is not deployment-ready; see the issues logged above");
    }

    let strategy = build_strategy(&config)?;
    tracing::info!(strategy = %strategy.name, "strategy assembled");

    tracing::error!("no live exchange gateway is wired into this build");
    tracing::info!("run `ict-paper` for a continuous run or `ict-simulated` for a bounded dry run");

    Ok(())
}
