//! Test helpers shared across the workspace: candle/signal/position
//! builders and a no-op audit logger for dependency injection in tests.

pub mod helpers;

pub use helpers::*;
