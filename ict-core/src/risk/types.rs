//! Types shared by the risk guard: account state, configured limits, and
//! the outcome of a sizing/validation pass.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account-level state the risk guard needs to size and gate a trade.
/// Supplied fresh by the caller on every validation — the guard itself is
/// stateless except for its rate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub equity: Decimal,
    pub available_balance: Decimal,
    pub open_position_count: u32,
    pub daily_realized_pnl: Decimal,
    pub daily_starting_equity: Decimal,
}

/// Per-symbol exchange filters a sized order must respect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFilters {
    pub lot_size: Decimal,
    pub min_notional: Decimal,
    pub max_leverage: Decimal,
    pub tick_size: Decimal,
}

/// Configured risk limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Fraction of equity risked per trade (e.g. 0.01 = 1%).
    pub max_risk_per_trade: Decimal,
    /// Cap on a single position's notional as a fraction of equity × leverage.
    pub max_position_size_percent: Decimal,
    /// Maximum concurrently open positions across all symbols.
    pub max_open_positions: u32,
    /// Daily loss, as a fraction of starting equity, beyond which new
    /// entries are blocked.
    pub max_daily_loss_percent: Decimal,
    /// Floor applied to the stop-distance-as-fraction-of-entry used in
    /// sizing, so a near-zero SL distance cannot blow up position size.
    pub min_sl_distance_percent: Decimal,
    /// Leverage requested for new positions.
    pub leverage: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            max_risk_per_trade: dec!(0.01),
            max_position_size_percent: dec!(0.20),
            max_open_positions: 5,
            max_daily_loss_percent: dec!(0.05),
            min_sl_distance_percent: dec!(0.001),
            leverage: dec!(5),
        }
    }
}

/// Outcome of sizing a validated entry signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingResult {
    pub quantity: Decimal,
    pub notional: Decimal,
    pub risk_usdt: Decimal,
    pub sl_distance_percent: Decimal,
    pub capped_by_max_position_size: bool,
}
