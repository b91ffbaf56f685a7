//! Domain-specific error types for trading core operations.
//!
//! These error types provide precise information about failures at every
//! I/O and domain boundary, enabling callers to distinguish "retry this" from
//! "stop and alert" without string-matching a message.

use rust_decimal::Decimal;
use std::fmt;

/// Errors raised while validating or applying configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A required field was absent.
    MissingField { field: &'static str },

    /// A field's value is out of the allowed range.
    OutOfRange {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Two fields conflict (e.g. `max_position_size_percent` below
    /// `min_position_size_percent`).
    Conflict { reason: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingField { field } => {
                write!(f, "missing required configuration field: {field}")
            }
            ConfigurationError::OutOfRange { field, value, reason } => {
                write!(f, "configuration field {field} has invalid value {value}: {reason}")
            }
            ConfigurationError::Conflict { reason } => {
                write!(f, "conflicting configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Errors raised while constructing or validating domain types (candles,
/// signals, sizing).
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A candle's OHLC bounds or volume violated the domain invariant.
    BadOhlcBounds { reason: String },

    /// An entry signal is missing its take-profit or stop-loss.
    MissingBracket { which: &'static str },

    /// TP/SL are on the wrong side of entry for the signal's direction.
    TpSlWrongSide {
        kind: String,
        entry: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
    },

    /// A computed position size fell at or below zero after capping/flooring.
    NonPositiveSize { computed: Decimal },

    /// A price or quantity failed exchange lot/tick-size rounding.
    PrecisionViolation { field: &'static str, value: Decimal },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::BadOhlcBounds { reason } => write!(f, "invalid candle: {reason}"),
            ValidationError::MissingBracket { which } => {
                write!(f, "entry signal missing required {which}")
            }
            ValidationError::TpSlWrongSide {
                kind,
                entry,
                take_profit,
                stop_loss,
            } => write!(
                f,
                "{kind} has take_profit/stop_loss on the wrong side of entry \
                 (entry={entry}, take_profit={take_profit}, stop_loss={stop_loss})"
            ),
            ValidationError::NonPositiveSize { computed } => {
                write!(f, "computed position size is non-positive: {computed}")
            }
            ValidationError::PrecisionViolation { field, value } => {
                write!(f, "{field} value {value} violates exchange precision rules")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors returned by an order gateway while placing, amending, or
/// canceling orders.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderExecutionError {
    /// The exchange rejected the order outright (bad symbol, insufficient
    /// margin, filters failed). Not retryable.
    Rejected { reason: String },

    /// The order was accepted but its fill could not be confirmed before
    /// a timeout; caller must reconcile via position/order query.
    ConfirmationTimeout { order_id: Option<String> },

    /// A reduce-only order referenced a position that no longer exists.
    NoMatchingPosition { symbol: String },

    /// The gateway itself is unavailable (connection dropped, auth expired).
    GatewayUnavailable { reason: String },
}

impl fmt::Display for OrderExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderExecutionError::Rejected { reason } => write!(f, "order rejected: {reason}"),
            OrderExecutionError::ConfirmationTimeout { order_id } => write!(
                f,
                "order confirmation timed out (order_id={})",
                order_id.as_deref().unwrap_or("unknown")
            ),
            OrderExecutionError::NoMatchingPosition { symbol } => {
                write!(f, "no matching position for reduce-only order on {symbol}")
            }
            OrderExecutionError::GatewayUnavailable { reason } => {
                write!(f, "order gateway unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for OrderExecutionError {}

/// Transient failures that the retry/backoff layer should retry.
#[derive(Debug, Clone, PartialEq)]
pub enum TransientApiError {
    /// Network-level failure (timeout, connection reset).
    NetworkError { reason: String },

    /// The exchange rate-limited the request.
    RateLimited { retry_after_ms: Option<u64> },

    /// The exchange returned a 5xx-equivalent server error.
    ServerError { status: u16, reason: String },
}

impl fmt::Display for TransientApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientApiError::NetworkError { reason } => write!(f, "network error: {reason}"),
            TransientApiError::RateLimited { retry_after_ms } => write!(
                f,
                "rate limited{}",
                retry_after_ms
                    .map(|ms| format!(", retry after {ms}ms"))
                    .unwrap_or_default()
            ),
            TransientApiError::ServerError { status, reason } => {
                write!(f, "server error {status}: {reason}")
            }
        }
    }
}

impl std::error::Error for TransientApiError {}

/// Failures authenticating with the exchange. Never retryable without
/// operator intervention.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationError {
    InvalidCredentials,
    SignatureRejected { reason: String },
    Expired,
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthenticationError::InvalidCredentials => write!(f, "invalid API credentials"),
            AuthenticationError::SignatureRejected { reason } => {
                write!(f, "request signature rejected: {reason}")
            }
            AuthenticationError::Expired => write!(f, "credentials expired"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Internal consistency failures: state the engine should never reach.
/// Surfacing these distinctly lets callers choose to halt rather than retry.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// The engine state machine received an event invalid for its state.
    InvalidStateTransition { from: String, event: String },

    /// A cache (position, indicator) held data inconsistent with itself.
    CacheCorruption { cache: &'static str, reason: String },

    /// A determiner returned requirements or a decision violating its own
    /// declared contract.
    ContractViolation { determiner: String, reason: String },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::InvalidStateTransition { from, event } => {
                write!(f, "invalid state transition: {event} while in {from}")
            }
            IntegrityError::CacheCorruption { cache, reason } => {
                write!(f, "{cache} cache corrupted: {reason}")
            }
            IntegrityError::ContractViolation { determiner, reason } => {
                write!(f, "determiner {determiner} violated its contract: {reason}")
            }
        }
    }
}

impl std::error::Error for IntegrityError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn validation_error_display_includes_reason() {
        let err = ValidationError::BadOhlcBounds {
            reason: "low exceeds open".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("low exceeds open"));
    }

    #[test]
    fn tp_sl_wrong_side_display_includes_prices() {
        let err = ValidationError::TpSlWrongSide {
            kind: "LongEntry".into(),
            entry: dec!(100),
            take_profit: dec!(90),
            stop_loss: dec!(95),
        };
        let msg = format!("{err}");
        assert!(msg.contains("entry=100"));
    }

    #[test]
    fn transient_api_error_rate_limited_without_retry_after() {
        let err = TransientApiError::RateLimited { retry_after_ms: None };
        assert_eq!(format!("{err}"), "rate limited");
    }
}
