//! Fail-safe emergency liquidation: cancel resting orders and flatten
//! every open position on shutdown, never raising regardless of what the
//! exchange does. Reentrant, timeout-bounded, and audited, built on this
//! crate's own [`crate::resilience::retry`].

use crate::audit::{AuditEventType, AuditFields, AuditLogger};
use crate::config::types::LiquidationConfig;
use crate::core::types::{LiquidationResult, LiquidationState, PositionSide};
use crate::execution::OrderGateway;
use crate::resilience::{retry, BackoffConfig};
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

fn new_correlation_id() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

pub struct LiquidationManager {
    config: LiquidationConfig,
    gateway: Arc<dyn OrderGateway>,
    audit: Option<Arc<AuditLogger>>,
    state: Mutex<LiquidationState>,
}

impl LiquidationManager {
    pub fn new(config: LiquidationConfig, gateway: Arc<dyn OrderGateway>, audit: Option<Arc<AuditLogger>>) -> Self {
        Self { config, gateway, audit, state: Mutex::new(LiquidationState::Idle) }
    }

    pub fn state(&self) -> LiquidationState {
        *self.state.lock()
    }

    /// Cancel orders and flatten positions for `symbols`. Never returns an
    /// `Err` — every failure mode is folded into `LiquidationResult`.
    pub async fn execute_liquidation(&self, symbols: &[String]) -> LiquidationResult {
        {
            let mut state = self.state.lock();
            if *state != LiquidationState::Idle {
                return LiquidationResult {
                    state: LiquidationState::Failed,
                    positions_closed: 0,
                    positions_failed: 0,
                    orders_canceled: 0,
                    orders_failed: 0,
                    duration_secs: 0.0,
                    error_message: Some("liquidation already in progress".to_string()),
                };
            }
            *state = LiquidationState::InProgress;
        }

        let correlation_id = new_correlation_id();
        let started = Instant::now();

        if !self.config.emergency_liquidation {
            self.log(AuditEventType::LiquidationComplete, "execute_liquidation", symbols, &correlation_id, Some("skipped: emergency_liquidation disabled"));
            *self.state.lock() = LiquidationState::Idle;
            return LiquidationResult {
                state: LiquidationState::Skipped,
                positions_closed: 0,
                positions_failed: 0,
                orders_canceled: 0,
                orders_failed: 0,
                duration_secs: started.elapsed().as_secs_f64(),
                error_message: None,
            };
        }

        let timeout = Duration::from_secs_f64(self.config.timeout_seconds.clamp(1.0, 30.0));
        let result = match tokio::time::timeout(timeout, self.run_protocol(symbols, &correlation_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%correlation_id, "liquidation timed out");
                LiquidationResult {
                    state: LiquidationState::Failed,
                    positions_closed: 0,
                    positions_failed: symbols.len() as u32,
                    orders_canceled: 0,
                    orders_failed: 0,
                    duration_secs: started.elapsed().as_secs_f64(),
                    error_message: Some(format!("liquidation exceeded {}s timeout", self.config.timeout_seconds)),
                }
            }
        };

        self.log(
            AuditEventType::LiquidationComplete,
            "execute_liquidation",
            symbols,
            &correlation_id,
            result.error_message.as_deref(),
        );
        *self.state.lock() = LiquidationState::Idle;
        result
    }

    async fn run_protocol(&self, symbols: &[String], correlation_id: &str) -> LiquidationResult {
        let started = Instant::now();
        let mut orders_canceled = 0u32;
        let mut orders_failed = 0u32;
        let mut positions_closed = 0u32;
        let mut positions_failed = 0u32;
        let backoff = BackoffConfig {
            max_retries: Some(self.config.max_retries as usize),
            initial_delay: Duration::from_secs_f64(self.config.retry_delay_seconds),
            ..BackoffConfig::aggressive()
        };

        if self.config.cancel_orders {
            for symbol in symbols {
                match retry(backoff.clone(), || self.gateway.cancel_all_orders(symbol)).await {
                    Ok(_count) => orders_canceled += 1,
                    Err(e) => {
                        orders_failed += 1;
                        error!(correlation_id = %correlation_id, symbol = %symbol, %e, "failed to cancel orders during liquidation");
                    }
                }
            }
        }

        if self.config.close_positions {
            match self.gateway.get_all_positions().await {
                Ok(positions) => {
                    for (symbol, position) in positions {
                        if position.quantity.is_zero() || !symbols.contains(&symbol) {
                            continue;
                        }
                        match retry(backoff.clone(), || self.gateway.execute_market_close(&symbol)).await {
                            Ok(receipt) => {
                                positions_closed += 1;
                                let exit_price = average_fill_price(&receipt.fills).unwrap_or(position.entry_price);
                                let realized = realized_pnl(&position.side, position.entry_price, exit_price, position.quantity);
                                self.log_trade_closed(&symbol, realized, correlation_id);
                            }
                            Err(e) => {
                                positions_failed += 1;
                                error!(correlation_id = %correlation_id, symbol = %symbol, %e, "failed to close position during liquidation");
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(correlation_id = %correlation_id, %e, "failed to query positions during liquidation");
                    positions_failed += symbols.len() as u32;
                }
            }
        }

        let state = match (positions_failed + orders_failed, positions_closed + orders_canceled) {
            (0, _) => LiquidationState::Completed,
            (_, 0) => LiquidationState::Failed,
            _ => LiquidationState::Partial,
        };

        LiquidationResult {
            state,
            positions_closed,
            positions_failed,
            orders_canceled,
            orders_failed,
            duration_secs: started.elapsed().as_secs_f64(),
            error_message: None,
        }
    }

    fn log_trade_closed(&self, symbol: &str, realized_pnl: Decimal, correlation_id: &str) {
        if let Some(audit) = &self.audit {
            audit.log_event(
                AuditEventType::TradeClosed,
                "execute_liquidation",
                AuditFields {
                    symbol: Some(symbol.to_string()),
                    additional_data: Some(json!({
                        "exit_reason": "emergency_liquidation",
                        "realized_pnl": realized_pnl.to_string(),
                        "correlation_id": correlation_id,
                    })),
                    ..Default::default()
                },
            );
        }
    }

    fn log(&self, event_type: AuditEventType, operation: &str, symbols: &[String], correlation_id: &str, note: Option<&str>) {
        if let Some(audit) = &self.audit {
            audit.log_event(
                event_type,
                operation,
                AuditFields {
                    additional_data: Some(json!({
                        "symbols": symbols,
                        "correlation_id": correlation_id,
                        "note": note,
                    })),
                    ..Default::default()
                },
            );
        }
        info!(?symbols, correlation_id = %correlation_id, ?note, "liquidation protocol step");
    }
}

fn average_fill_price(fills: &[crate::execution::types::Fill]) -> Option<Decimal> {
    if fills.is_empty() {
        return None;
    }
    let total_qty: Decimal = fills.iter().map(|f| f.quantity).sum();
    if total_qty.is_zero() {
        return None;
    }
    let weighted: Decimal = fills.iter().map(|f| f.price * f.quantity).sum();
    Some(weighted / total_qty)
}

fn realized_pnl(side: &PositionSide, entry: Decimal, exit: Decimal, quantity: Decimal) -> Decimal {
    match side {
        PositionSide::Long => (exit - entry) * quantity,
        PositionSide::Short => (entry - exit) * quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::simulated::SimulatedGateway;
    use crate::testing::helpers::long_entry_signal;
    use rust_decimal_macros::dec;

    fn config(emergency: bool) -> LiquidationConfig {
        LiquidationConfig { emergency_liquidation: emergency, close_positions: true, cancel_orders: true, timeout_seconds: 5.0, max_retries: 2, retry_delay_seconds: 0.01 }
    }

    #[tokio::test]
    async fn skips_when_emergency_liquidation_disabled() {
        let gateway = Arc::new(SimulatedGateway::new(dec!(10000)));
        let manager = LiquidationManager::new(config(false), gateway, None);
        let result = manager.execute_liquidation(&["BTCUSDT".to_string()]).await;
        assert_eq!(result.state, LiquidationState::Skipped);
    }

    #[tokio::test]
    async fn flattens_an_open_position_and_reports_completed() {
        let gateway = Arc::new(SimulatedGateway::new(dec!(10000)));
        gateway.execute_signal(&long_entry_signal("BTCUSDT", dec!(100)), dec!(1)).await.unwrap();
        let manager = LiquidationManager::new(config(true), gateway, None);
        let result = manager.execute_liquidation(&["BTCUSDT".to_string()]).await;
        assert_eq!(result.state, LiquidationState::Completed);
        assert_eq!(result.positions_closed, 1);
    }

    #[tokio::test]
    async fn reentrant_call_is_rejected() {
        let gateway = Arc::new(SimulatedGateway::new(dec!(10000)));
        let manager = Arc::new(LiquidationManager::new(config(true), gateway, None));
        *manager.state.lock() = LiquidationState::InProgress;
        let result = manager.execute_liquidation(&["BTCUSDT".to_string()]).await;
        assert_eq!(result.state, LiquidationState::Failed);
        assert!(result.error_message.unwrap().contains("already in progress"));
    }
}
