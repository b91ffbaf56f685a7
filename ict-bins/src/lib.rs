//! Shared wiring for the `ict-bins` binaries.

pub mod common;
