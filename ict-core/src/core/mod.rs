//! Core domain types shared by every subsystem.
//!
//! - `types`: Candle, Signal, Order, Position, ICT feature types (FairValueGap,
//!   OrderBlock, MarketStructure), Event envelope, LiquidationResult.
//! - `errors`: the error taxonomy from ConfigurationError through
//!   IntegrityError, used at every I/O and domain boundary.

pub mod errors;
pub mod types;

pub use errors::{
    AuthenticationError, ConfigurationError, IntegrityError, OrderExecutionError,
    TransientApiError, ValidationError,
};
pub use types::*;
