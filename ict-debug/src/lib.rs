//! Shared wiring for the `ict-debug` operator CLIs.

pub mod common;
