//! Order execution.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 OrderGateway trait                    │
//! ├──────────────────────────────────────────────────────┤
//! │ set_leverage()  execute_signal()  cancel_all_orders() │
//! │ get_position()  get_all_positions()  get_account_balance() │
//! └──────────────────────────────────────────────────────┘
//!            │                              │
//!            v                              v
//!   ┌──────────────────┐          ┌────────────────────┐
//!   │ SimulatedGateway  │          │  (live adapter,     │
//!   │ instant fills,    │          │   out of scope —     │
//!   │ paper trading     │          │   see ict-bins)     │
//!   └──────────────────┘          └────────────────────┘
//! ```
//!
//! A concrete exchange wire client is out of scope; the trait boundary and
//! a deterministic simulated implementation — needed for tests and paper
//! trading — are in scope.

pub mod simulated;
pub mod types;

use crate::core::errors::{OrderExecutionError, TransientApiError};
use crate::core::types::{MarginType, Order, Position, Signal};
use async_trait::async_trait;
use types::{AccountBalance, ExecutionReceipt, PositionSnapshot};

/// Errors an [`OrderGateway`] call may return. `Transient` is retryable by
/// the caller via [`crate::resilience::retry`]; the others are not.
#[derive(Debug, Clone)]
pub enum GatewayError {
    Transient(TransientApiError),
    Execution(OrderExecutionError),
    Authentication(crate::core::errors::AuthenticationError),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Transient(e) => write!(f, "{e}"),
            GatewayError::Execution(e) => write!(f, "{e}"),
            GatewayError::Authentication(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// Whether the retry layer should retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

/// The boundary between the trading core and an exchange. Implementors
/// drive real orders (or, for [`simulated::SimulatedGateway`], simulate
/// them); the rest of the engine never depends on exchange wire details.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn set_leverage(&self, symbol: &str, leverage: rust_decimal::Decimal) -> Result<(), GatewayError>;

    async fn set_margin_type(&self, symbol: &str, margin_type: MarginType) -> Result<(), GatewayError>;

    /// Place an entry order sized by the caller (the risk guard), then rest
    /// reduce-only take-profit/stop-loss bracket orders from
    /// `signal.take_profit`/`signal.stop_loss` (see
    /// [`types::BracketRequest::from_signal`]). The receipt's
    /// `bracket_orders` carries whichever legs were actually placed — zero,
    /// one, or both, depending on what the signal set.
    async fn execute_signal(&self, signal: &Signal, quantity: rust_decimal::Decimal) -> Result<ExecutionReceipt, GatewayError>;

    /// Close a position at market, bypassing brackets. Used by exits and
    /// by the liquidation manager.
    async fn execute_market_close(&self, symbol: &str) -> Result<ExecutionReceipt, GatewayError>;

    async fn cancel_all_orders(&self, symbol: &str) -> Result<u32, GatewayError>;

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, GatewayError>;

    async fn get_all_positions(&self) -> Result<PositionSnapshot, GatewayError>;

    async fn get_account_balance(&self) -> Result<AccountBalance, GatewayError>;

    /// Submit a raw order outside the signal pipeline (e.g. a reduce-only
    /// bracket order placed directly by the engine).
    async fn place_order(&self, order: Order) -> Result<ExecutionReceipt, GatewayError>;
}
