//! Types exchanged with an [`OrderGateway`](crate::execution::OrderGateway).

use crate::core::types::{Order, OrderType, Position, Side, Signal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A confirmed fill (full or partial) reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub timestamp: crate::core::types::UnixMillis,
}

/// Account balance snapshot, as returned by
/// [`OrderGateway::get_account_balance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    pub equity: Decimal,
    pub available_balance: Decimal,
    pub unrealized_pnl: Decimal,
}

/// The result of submitting an order: either it's already filled/placed,
/// or it's resting and the caller must track it via position/order polling.
/// `bracket_orders` carries the reduce-only take-profit/stop-loss orders
/// [`crate::execution::OrderGateway::execute_signal`] placed alongside the
/// entry, if the signal carried `take_profit`/`stop_loss` prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub order: Order,
    pub fills: Vec<Fill>,
    #[serde(default)]
    pub bracket_orders: Vec<Order>,
}

/// Used by [`crate::execution::OrderGateway::execute_signal`] to tell the
/// gateway what bracket orders to place alongside the entry.
#[derive(Debug, Clone)]
pub struct BracketRequest {
    pub entry: Order,
    pub take_profit: Option<Order>,
    pub stop_loss: Option<Order>,
}

impl BracketRequest {
    /// Build the reduce-only take-profit/stop-loss orders a gateway should
    /// rest alongside `entry`, from the prices (if any) the signal carries.
    /// Both close the position, so they take the opposite side of `entry`.
    pub fn from_signal(signal: &Signal, quantity: Decimal, entry: Order) -> Self {
        let closing_side = entry.side.opposite();
        let take_profit = signal
            .take_profit
            .map(|price| Order::reduce_only_bracket(signal.symbol.clone(), closing_side, OrderType::TakeProfitMarket, quantity, price));
        let stop_loss = signal
            .stop_loss
            .map(|price| Order::reduce_only_bracket(signal.symbol.clone(), closing_side, OrderType::StopMarket, quantity, price));
        Self { entry, take_profit, stop_loss }
    }

    /// The bracket legs that were actually requested, for callers that just
    /// want to publish/track them without matching on `Option`.
    pub fn legs(&self) -> Vec<Order> {
        [self.take_profit.clone(), self.stop_loss.clone()].into_iter().flatten().collect()
    }
}

/// Snapshot of all open positions, keyed by symbol.
pub type PositionSnapshot = std::collections::HashMap<String, Position>;
