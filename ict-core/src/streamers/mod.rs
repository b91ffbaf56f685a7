//! Exchange stream adapters: the only components allowed to run off the
//! engine's single-threaded runtime. They never execute business logic —
//! they translate exchange wire messages into [`crate::core::types::Event`]s
//! and schedule them onto the bus.
//!
//! A concrete exchange wire client is out of scope; the trait boundaries
//! here are what `ict-bins` wires a real adapter against.

pub mod market;
pub mod user;

pub use market::PublicMarketStreamer;
pub use user::PrivateUserStreamer;
