//! Resilience primitives: exponential backoff and the retry loop built on
//! top of it.

pub mod backoff;
pub mod retry;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use retry::{retry, Retryable};
