//! Pre-trade validation: exchange-filter rounding and sanity checks applied
//! to a signal before it is sized, independent of account state.

use crate::core::errors::ValidationError;
use crate::core::types::Signal;
use crate::risk::types::SymbolFilters;
use rust_decimal::Decimal;

/// Validates a signal against exchange filters and basic sanity rules.
pub struct PreTradeValidator;

impl PreTradeValidator {
    /// Round a quantity down to the nearest `lot_size` multiple.
    pub fn floor_to_lot_size(quantity: Decimal, filters: &SymbolFilters) -> Decimal {
        if filters.lot_size.is_zero() {
            return quantity;
        }
        (quantity / filters.lot_size).floor() * filters.lot_size
    }

    /// Round a price to the nearest `tick_size`.
    pub fn round_to_tick_size(price: Decimal, filters: &SymbolFilters) -> Decimal {
        if filters.tick_size.is_zero() {
            return price;
        }
        (price / filters.tick_size).round() * filters.tick_size
    }

    /// Sanity-check a signal's prices before sizing: no zero/negative
    /// entry, and (for entries) a valid TP/SL ordering.
    pub fn validate_signal(signal: &Signal) -> Result<(), ValidationError> {
        if signal.entry_price <= Decimal::ZERO {
            return Err(ValidationError::PrecisionViolation {
                field: "entry_price",
                value: signal.entry_price,
            });
        }
        signal.validate_tp_sl_ordering()
    }

    /// A sized notional must clear the exchange's minimum notional filter.
    pub fn meets_min_notional(notional: Decimal, filters: &SymbolFilters) -> bool {
        notional >= filters.min_notional
    }
}
