//! A deterministic, in-process [`OrderGateway`] implementation: fills
//! instantly at the requested price (minus a configurable taker fee), with
//! state kept in a `DashMap`. Used for tests and paper trading.

use super::types::{AccountBalance, BracketRequest, ExecutionReceipt, Fill, PositionSnapshot};
use super::{GatewayError, OrderGateway};
use crate::core::types::{MarginType, Order, OrderStatus, Position, PositionSide, Side, Signal, UnixMillis};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// Taker fee applied to every simulated fill, as a fraction of notional.
const DEFAULT_TAKER_FEE: Decimal = Decimal::from_parts(2, 0, 0, false, 4); // 0.0002 = 2 bps

pub struct SimulatedGateway {
    starting_equity: Decimal,
    positions: DashMap<String, Position>,
    realized_pnl: Mutex<Decimal>,
    next_order_id: std::sync::atomic::AtomicU64,
    /// Reduce-only bracket orders resting per symbol, placed by
    /// `execute_signal` and removed by `cancel_all_orders`. This gateway
    /// never fills them on its own — it has no price feed to trigger
    /// against — so a caller that wants the orphan-prevention fill path
    /// exercised end-to-end must fill the entry, call
    /// [`Self::cancel_all_orders`] itself (as the engine does once the
    /// other bracket leg fills), or close the position via
    /// `execute_market_close`.
    resting_brackets: DashMap<String, Vec<Order>>,
}

impl SimulatedGateway {
    pub fn new(starting_equity: Decimal) -> Self {
        Self {
            starting_equity,
            positions: DashMap::new(),
            realized_pnl: Mutex::new(Decimal::ZERO),
            next_order_id: std::sync::atomic::AtomicU64::new(1),
            resting_brackets: DashMap::new(),
        }
    }

    /// Bracket orders currently resting for `symbol`, for tests and debug
    /// tooling that want to confirm brackets were actually placed.
    pub fn resting_brackets(&self, symbol: &str) -> Vec<Order> {
        self.resting_brackets.get(symbol).map(|v| v.clone()).unwrap_or_default()
    }

    fn next_id(&self) -> String {
        let id = self.next_order_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("sim-{id}")
    }

    fn apply_fill(&self, symbol: &str, side: Side, price: Decimal, quantity: Decimal) -> Fill {
        let fee = price * quantity * DEFAULT_TAKER_FEE;
        let order_id = self.next_id();

        self.positions
            .entry(symbol.to_string())
            .and_modify(|pos| {
                let position_side_matches = (pos.side == PositionSide::Long && side == Side::Buy)
                    || (pos.side == PositionSide::Short && side == Side::Sell);
                if position_side_matches {
                    let new_qty = pos.quantity + quantity;
                    pos.entry_price = (pos.entry_price * pos.quantity + price * quantity) / new_qty;
                    pos.quantity = new_qty;
                } else if pos.quantity > quantity {
                    let closed_pnl = match pos.side {
                        PositionSide::Long => (price - pos.entry_price) * quantity,
                        PositionSide::Short => (pos.entry_price - price) * quantity,
                    };
                    *self.realized_pnl.lock() += closed_pnl - fee;
                    pos.quantity -= quantity;
                } else {
                    let closed_pnl = match pos.side {
                        PositionSide::Long => (price - pos.entry_price) * pos.quantity,
                        PositionSide::Short => (pos.entry_price - price) * pos.quantity,
                    };
                    *self.realized_pnl.lock() += closed_pnl - fee;
                    let remainder = quantity - pos.quantity;
                    pos.side = if side == Side::Buy { PositionSide::Long } else { PositionSide::Short };
                    pos.quantity = remainder;
                    pos.entry_price = price;
                }
            })
            .or_insert_with(|| Position {
                symbol: symbol.to_string(),
                side: if side == Side::Buy { PositionSide::Long } else { PositionSide::Short },
                entry_price: price,
                quantity,
                leverage: Decimal::ONE,
                unrealized_pnl: Decimal::ZERO,
                liquidation_price: None,
                entry_time: Some(UnixMillis::now()),
            });

        self.positions.retain(|_, pos| !pos.quantity.is_zero());

        Fill {
            order_id,
            symbol: symbol.to_string(),
            side,
            price,
            quantity,
            fee,
            timestamp: UnixMillis::now(),
        }
    }
}

#[async_trait]
impl OrderGateway for SimulatedGateway {
    async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> Result<(), GatewayError> {
        if let Some(mut pos) = self.positions.get_mut(symbol) {
            pos.leverage = leverage;
        }
        Ok(())
    }

    async fn set_margin_type(&self, _symbol: &str, _margin_type: MarginType) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn execute_signal(&self, signal: &Signal, quantity: Decimal) -> Result<ExecutionReceipt, GatewayError> {
        let side = match signal.kind.position_side() {
            PositionSide::Long => Side::Buy,
            PositionSide::Short => Side::Sell,
        };
        let fill = self.apply_fill(&signal.symbol, side, signal.entry_price, quantity);
        let mut order = Order::market(signal.symbol.clone(), side, quantity);
        order.id = Some(fill.order_id.clone());
        order.status = OrderStatus::Filled;
        order.filled_quantity = quantity;

        let bracket = BracketRequest::from_signal(signal, quantity, order.clone());
        let bracket_orders = bracket.legs();
        if !bracket_orders.is_empty() {
            let placed: Vec<Order> = bracket_orders
                .into_iter()
                .enumerate()
                .map(|(i, mut leg)| {
                    leg.id = Some(format!("{}-bracket-{i}", fill.order_id));
                    leg
                })
                .collect();
            self.resting_brackets.insert(signal.symbol.clone(), placed.clone());
            return Ok(ExecutionReceipt { order, fills: vec![fill], bracket_orders: placed });
        }

        Ok(ExecutionReceipt { order, fills: vec![fill], bracket_orders: vec![] })
    }

    async fn execute_market_close(&self, symbol: &str) -> Result<ExecutionReceipt, GatewayError> {
        let Some(pos) = self.positions.get(symbol).map(|p| p.clone()) else {
            return Err(GatewayError::Execution(crate::core::errors::OrderExecutionError::NoMatchingPosition {
                symbol: symbol.to_string(),
            }));
        };
        let side = pos.side.closing_order_side();
        let fill = self.apply_fill(symbol, side, pos.entry_price, pos.quantity);
        let mut order = Order::market(symbol, side, pos.quantity);
        order.id = Some(fill.order_id.clone());
        order.status = OrderStatus::Filled;
        order.filled_quantity = pos.quantity;
        order.reduce_only = true;
        Ok(ExecutionReceipt { order, fills: vec![fill], bracket_orders: vec![] })
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<u32, GatewayError> {
        let canceled = self.resting_brackets.remove(symbol).map(|(_, orders)| orders.len()).unwrap_or(0);
        Ok(canceled as u32)
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError> {
        Ok(self.positions.get(symbol).map(|p| p.clone()))
    }

    async fn get_all_positions(&self) -> Result<PositionSnapshot, GatewayError> {
        Ok(self.positions.iter().map(|e| (e.key().clone(), e.value().clone())).collect())
    }

    async fn get_account_balance(&self) -> Result<AccountBalance, GatewayError> {
        let realized = *self.realized_pnl.lock();
        Ok(AccountBalance {
            equity: self.starting_equity + realized,
            available_balance: self.starting_equity + realized,
            unrealized_pnl: Decimal::ZERO,
        })
    }

    async fn place_order(&self, order: Order) -> Result<ExecutionReceipt, GatewayError> {
        let fill = self.apply_fill(&order.symbol, order.side, order.price.unwrap_or_default(), order.quantity);
        let mut filled = order;
        filled.id = Some(fill.order_id.clone());
        filled.status = OrderStatus::Filled;
        filled.filled_quantity = filled.quantity;
        Ok(ExecutionReceipt { order: filled, fills: vec![fill], bracket_orders: vec![] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SignalKind;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn long_signal() -> Signal {
        Signal {
            kind: SignalKind::LongEntry,
            symbol: "BTCUSDT".into(),
            entry_price: dec!(100),
            take_profit: Some(dec!(110)),
            stop_loss: Some(dec!(95)),
            strategy_name: "ict".into(),
            timestamp: UnixMillis(0),
            confidence: 0.8,
            exit_reason: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn execute_signal_opens_a_position() {
        let gw = SimulatedGateway::new(dec!(10000));
        gw.execute_signal(&long_signal(), dec!(1)).await.unwrap();
        let pos = gw.get_position("BTCUSDT").await.unwrap().unwrap();
        assert_eq!(pos.quantity, dec!(1));
        assert_eq!(pos.side, PositionSide::Long);
    }

    #[tokio::test]
    async fn execute_signal_rests_tp_and_sl_bracket_orders() {
        let gw = SimulatedGateway::new(dec!(10000));
        let receipt = gw.execute_signal(&long_signal(), dec!(1)).await.unwrap();
        assert_eq!(receipt.bracket_orders.len(), 2);
        assert!(receipt.bracket_orders.iter().all(|o| o.reduce_only && o.side == Side::Sell));
        assert_eq!(gw.resting_brackets("BTCUSDT").len(), 2);
    }

    #[tokio::test]
    async fn cancel_all_orders_clears_resting_brackets() {
        let gw = SimulatedGateway::new(dec!(10000));
        gw.execute_signal(&long_signal(), dec!(1)).await.unwrap();
        let canceled = gw.cancel_all_orders("BTCUSDT").await.unwrap();
        assert_eq!(canceled, 2);
        assert!(gw.resting_brackets("BTCUSDT").is_empty());
    }

    #[tokio::test]
    async fn market_close_realizes_pnl_and_flattens_position() {
        let gw = SimulatedGateway::new(dec!(10000));
        gw.execute_signal(&long_signal(), dec!(1)).await.unwrap();
        let receipt = gw.execute_market_close("BTCUSDT").await.unwrap();
        assert_eq!(receipt.order.status, OrderStatus::Filled);
        assert!(gw.get_position("BTCUSDT").await.unwrap().is_none());
        let balance = gw.get_account_balance().await.unwrap();
        assert_eq!(balance.equity, dec!(10000) - (dec!(100) * dec!(0.0002)) * dec!(2));
    }

    #[tokio::test]
    async fn close_without_position_errors() {
        let gw = SimulatedGateway::new(dec!(10000));
        let err = gw.execute_market_close("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, GatewayError::Execution(_)));
    }
}
