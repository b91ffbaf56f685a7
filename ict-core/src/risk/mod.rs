//! Risk management.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Risk Guard Pipeline                    │
//! ├───────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  Signal → PreTradeValidator → Sizing → Limit Checks        │
//! │             (sanity, filters)  (risk%)   (positions, daily)│
//! │                                                             │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! [`RiskGuard::validate`] is the single entry point the engine calls
//! before an entry signal is allowed to reach the order gateway. It never
//! mutates account state itself — callers own the [`types::AccountState`]
//! snapshot and decide what to do with a rejection.

pub mod pre_trade;
pub mod types;

use crate::core::errors::ValidationError;
use crate::core::types::{Position, Signal};
use pre_trade::PreTradeValidator;
use rust_decimal::Decimal;
use types::{AccountState, RiskLimits, SizingResult, SymbolFilters};

/// Why a signal was rejected before reaching the order gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskRejection {
    Validation(ValidationError),
    MaxOpenPositions { current: u32, limit: u32 },
    DailyLossLimitBreached { loss_percent: Decimal, limit_percent: Decimal },
    BelowMinNotional { notional: Decimal, min_notional: Decimal },
    NonPositiveSize { computed: Decimal },
    NoMatchingPosition { symbol: String },
}

impl std::fmt::Display for RiskRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskRejection::Validation(e) => write!(f, "signal validation failed: {e}"),
            RiskRejection::MaxOpenPositions { current, limit } => {
                write!(f, "max open positions reached ({current}/{limit})")
            }
            RiskRejection::DailyLossLimitBreached { loss_percent, limit_percent } => write!(
                f,
                "daily loss limit breached: {loss_percent:.4} exceeds {limit_percent:.4}"
            ),
            RiskRejection::BelowMinNotional { notional, min_notional } => {
                write!(f, "sized notional {notional} below exchange minimum {min_notional}")
            }
            RiskRejection::NonPositiveSize { computed } => {
                write!(f, "computed size {computed} is non-positive after capping/flooring")
            }
            RiskRejection::NoMatchingPosition { symbol } => {
                write!(f, "exit signal for {symbol} has no matching-side open position")
            }
        }
    }
}

impl std::error::Error for RiskRejection {}

impl From<ValidationError> for RiskRejection {
    fn from(e: ValidationError) -> Self {
        RiskRejection::Validation(e)
    }
}

/// Stateless risk gate: sizes and validates a single entry signal against
/// account state, configured limits, and exchange filters.
pub struct RiskGuard {
    limits: RiskLimits,
}

impl RiskGuard {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Full pre-trade pipeline: sanity-check the signal, compute a sized
    /// quantity respecting the configured risk-per-trade and caps, then
    /// enforce portfolio-level limits (open positions, daily loss).
    ///
    /// Position sizing formula:
    /// `risk_usdt = equity × max_risk_per_trade`;
    /// `sl_distance = max(|entry − stop| / entry, min_sl_distance_percent)`;
    /// `position_val = risk_usdt / sl_distance`;
    /// `quantity = position_val / entry`, capped by
    /// `max_position_size_percent × leverage` of equity, then floored to
    /// the symbol's lot size.
    pub fn validate(
        &self,
        signal: &Signal,
        account: &AccountState,
        filters: &SymbolFilters,
    ) -> Result<SizingResult, RiskRejection> {
        PreTradeValidator::validate_signal(signal)?;

        if account.open_position_count >= self.limits.max_open_positions {
            return Err(RiskRejection::MaxOpenPositions {
                current: account.open_position_count,
                limit: self.limits.max_open_positions,
            });
        }

        if account.daily_starting_equity > Decimal::ZERO {
            let loss_percent = (-account.daily_realized_pnl / account.daily_starting_equity).max(Decimal::ZERO);
            if loss_percent >= self.limits.max_daily_loss_percent {
                return Err(RiskRejection::DailyLossLimitBreached {
                    loss_percent,
                    limit_percent: self.limits.max_daily_loss_percent,
                });
            }
        }

        let sizing = self.size_position(signal, account, filters)?;

        if !PreTradeValidator::meets_min_notional(sizing.notional, filters) {
            return Err(RiskRejection::BelowMinNotional {
                notional: sizing.notional,
                min_notional: filters.min_notional,
            });
        }

        Ok(sizing)
    }

    /// Exit signals require a matching-side existing position; reject
    /// otherwise rather than letting the gateway fail downstream with a raw
    /// execution error.
    pub fn validate_exit(&self, signal: &Signal, position: Option<&Position>) -> Result<(), RiskRejection> {
        match position {
            Some(pos) if pos.side == signal.kind.position_side() => Ok(()),
            _ => Err(RiskRejection::NoMatchingPosition { symbol: signal.symbol.clone() }),
        }
    }

    fn size_position(
        &self,
        signal: &Signal,
        account: &AccountState,
        filters: &SymbolFilters,
    ) -> Result<SizingResult, RiskRejection> {
        let stop_loss = signal
            .stop_loss
            .ok_or(ValidationError::MissingBracket { which: "stop_loss" })?;

        let raw_distance = (signal.entry_price - stop_loss).abs() / signal.entry_price;
        let sl_distance = raw_distance.max(self.limits.min_sl_distance_percent);

        let risk_usdt = account.equity * self.limits.max_risk_per_trade;
        let position_val = risk_usdt / sl_distance;
        let mut quantity = position_val / signal.entry_price;

        let max_notional = account.equity * self.limits.max_position_size_percent * self.limits.leverage;
        let uncapped_notional = quantity * signal.entry_price;
        let capped = uncapped_notional > max_notional;
        if capped {
            quantity = max_notional / signal.entry_price;
        }

        quantity = PreTradeValidator::floor_to_lot_size(quantity, filters);
        if quantity <= Decimal::ZERO {
            return Err(RiskRejection::NonPositiveSize { computed: quantity });
        }

        let notional = quantity * signal.entry_price;
        Ok(SizingResult {
            quantity,
            notional,
            risk_usdt,
            sl_distance_percent: sl_distance,
            capped_by_max_position_size: capped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{SignalKind, UnixMillis};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn account() -> AccountState {
        AccountState {
            equity: dec!(10000),
            available_balance: dec!(10000),
            open_position_count: 0,
            daily_realized_pnl: Decimal::ZERO,
            daily_starting_equity: dec!(10000),
        }
    }

    fn filters() -> SymbolFilters {
        SymbolFilters {
            lot_size: dec!(0.001),
            min_notional: dec!(5),
            max_leverage: dec!(20),
            tick_size: dec!(0.01),
        }
    }

    fn long_signal(entry: Decimal, sl: Decimal, tp: Decimal) -> Signal {
        Signal {
            kind: SignalKind::LongEntry,
            symbol: "BTCUSDT".into(),
            entry_price: entry,
            take_profit: Some(tp),
            stop_loss: Some(sl),
            strategy_name: "ict".into(),
            timestamp: UnixMillis(0),
            confidence: 0.8,
            exit_reason: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn sizes_position_from_risk_per_trade_and_sl_distance() {
        let guard = RiskGuard::new(RiskLimits::default());
        let signal = long_signal(dec!(100), dec!(99), dec!(102));
        let sizing = guard.validate(&signal, &account(), &filters()).unwrap();
        // risk_usdt = 10000 * 0.01 = 100; sl_distance = 0.01; position_val = 10000; qty = 100
        // capped by max_position_size_percent(0.20) * leverage(5) * equity(10000) = 10000 notional -> qty 100
        assert_eq!(sizing.quantity, dec!(100));
    }

    #[test]
    fn caps_size_at_max_position_percent() {
        let mut limits = RiskLimits::default();
        limits.max_risk_per_trade = dec!(0.5);
        let guard = RiskGuard::new(limits);
        let signal = long_signal(dec!(100), dec!(99), dec!(102));
        let sizing = guard.validate(&signal, &account(), &filters()).unwrap();
        assert!(sizing.capped_by_max_position_size);
    }

    #[test]
    fn rejects_when_max_open_positions_reached() {
        let guard = RiskGuard::new(RiskLimits::default());
        let mut acct = account();
        acct.open_position_count = 5;
        let signal = long_signal(dec!(100), dec!(99), dec!(102));
        let err = guard.validate(&signal, &acct, &filters()).unwrap_err();
        assert!(matches!(err, RiskRejection::MaxOpenPositions { .. }));
    }

    #[test]
    fn rejects_when_daily_loss_limit_breached() {
        let guard = RiskGuard::new(RiskLimits::default());
        let mut acct = account();
        acct.daily_realized_pnl = dec!(-600); // 6% of 10000, over default 5%
        let signal = long_signal(dec!(100), dec!(99), dec!(102));
        let err = guard.validate(&signal, &acct, &filters()).unwrap_err();
        assert!(matches!(err, RiskRejection::DailyLossLimitBreached { .. }));
    }

    #[test]
    fn validate_exit_accepts_matching_side_position() {
        let guard = RiskGuard::new(RiskLimits::default());
        let signal = Signal { kind: SignalKind::CloseLong, ..long_signal(dec!(100), dec!(99), dec!(102)) };
        let position = crate::core::types::Position {
            symbol: "BTCUSDT".into(),
            side: crate::core::types::PositionSide::Long,
            entry_price: dec!(100),
            quantity: dec!(1),
            leverage: dec!(1),
            unrealized_pnl: Decimal::ZERO,
            liquidation_price: None,
            entry_time: None,
        };
        assert!(guard.validate_exit(&signal, Some(&position)).is_ok());
    }

    #[test]
    fn validate_exit_rejects_when_no_position() {
        let guard = RiskGuard::new(RiskLimits::default());
        let signal = Signal { kind: SignalKind::CloseLong, ..long_signal(dec!(100), dec!(99), dec!(102)) };
        let err = guard.validate_exit(&signal, None).unwrap_err();
        assert!(matches!(err, RiskRejection::NoMatchingPosition { .. }));
    }

    #[test]
    fn validate_exit_rejects_opposite_side_position() {
        let guard = RiskGuard::new(RiskLimits::default());
        let signal = Signal { kind: SignalKind::CloseLong, ..long_signal(dec!(100), dec!(99), dec!(102)) };
        let position = crate::core::types::Position {
            symbol: "BTCUSDT".into(),
            side: crate::core::types::PositionSide::Short,
            entry_price: dec!(100),
            quantity: dec!(1),
            leverage: dec!(1),
            unrealized_pnl: Decimal::ZERO,
            liquidation_price: None,
            entry_time: None,
        };
        let err = guard.validate_exit(&signal, Some(&position)).unwrap_err();
        assert!(matches!(err, RiskRejection::NoMatchingPosition { .. }));
    }

    #[test]
    fn near_zero_sl_distance_is_floored() {
        let guard = RiskGuard::new(RiskLimits::default());
        let signal = long_signal(dec!(100), dec!(99.9999), dec!(102));
        let sizing = guard.validate(&signal, &account(), &filters()).unwrap();
        assert_eq!(sizing.sl_distance_percent, dec!(0.001));
    }
}
