//! Retry a fallible async operation using [`ExponentialBackoff`], stopping
//! immediately on a non-retryable error instead of burning through the
//! backoff schedule on a failure no amount of waiting will fix.

use super::backoff::{BackoffConfig, ExponentialBackoff};
use std::future::Future;
use tracing::warn;

/// Implemented by error types the retry loop needs to classify.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for crate::execution::GatewayError {
    fn is_retryable(&self) -> bool {
        crate::execution::GatewayError::is_retryable(self)
    }
}

/// Run `op` until it succeeds, a non-retryable error is returned, or the
/// backoff schedule is exhausted — whichever comes first.
pub async fn retry<T, E, F, Fut>(config: BackoffConfig, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = ExponentialBackoff::with_config(config);
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                let Some(delay) = backoff.next_delay() else {
                    return Err(err);
                };
                warn!(attempt = backoff.attempt_number(), %err, delay_ms = delay.as_millis() as u64, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
