//! Position reconciliation: periodically compares the engine's internal
//! position belief against the exchange-reported position and flags drift.
//!
//! Ported to `Decimal` quantities since this crate never uses raw
//! fixed-point i64s.

use crate::core::errors::IntegrityError;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Position reconciliation configuration.
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// How often to reconcile (in number of fills).
    pub reconcile_every_n_fills: u32,
    /// Maximum allowed position mismatch before halting.
    pub max_position_mismatch: Decimal,
    /// Whether to return an error on mismatch beyond `max_position_mismatch`.
    pub halt_on_mismatch: bool,
    /// Drift at or below this is logged but treated as a successful check.
    pub auto_correct_threshold: Decimal,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            reconcile_every_n_fills: 50,
            max_position_mismatch: dec!(0.001),
            halt_on_mismatch: true,
            auto_correct_threshold: dec!(0.0001),
        }
    }
}

/// Position reconciliation state and logic.
pub struct PositionReconciler {
    config: ReconciliationConfig,
    fills_since_last_check: AtomicU64,
    last_reconciliation: parking_lot::Mutex<Instant>,
    successful_reconciliations: AtomicU64,
    failed_reconciliations: AtomicU64,
    total_drift_detected: parking_lot::Mutex<Decimal>,
    max_drift_detected: parking_lot::Mutex<Decimal>,
}

impl PositionReconciler {
    pub fn new() -> Self {
        Self::with_config(ReconciliationConfig::default())
    }

    pub fn with_config(config: ReconciliationConfig) -> Self {
        Self {
            config,
            fills_since_last_check: AtomicU64::new(0),
            last_reconciliation: parking_lot::Mutex::new(Instant::now()),
            successful_reconciliations: AtomicU64::new(0),
            failed_reconciliations: AtomicU64::new(0),
            total_drift_detected: parking_lot::Mutex::new(Decimal::ZERO),
            max_drift_detected: parking_lot::Mutex::new(Decimal::ZERO),
        }
    }

    pub fn should_reconcile(&self) -> bool {
        self.fills_since_last_check.load(Ordering::Relaxed) >= self.config.reconcile_every_n_fills as u64
    }

    pub fn on_fill(&self) {
        self.fills_since_last_check.fetch_add(1, Ordering::Relaxed);
    }

    /// Compare the engine's belief about a symbol's position quantity with
    /// what the exchange reports. Returns the absolute drift, or an
    /// [`IntegrityError`] if it exceeds `max_position_mismatch` and
    /// `halt_on_mismatch` is set.
    pub fn reconcile(&self, symbol: &str, internal_qty: Decimal, exchange_qty: Decimal) -> Result<Decimal, IntegrityError> {
        self.fills_since_last_check.store(0, Ordering::Relaxed);
        *self.last_reconciliation.lock() = Instant::now();

        let drift = (internal_qty - exchange_qty).abs();

        *self.total_drift_detected.lock() += drift;
        let mut max_drift = self.max_drift_detected.lock();
        if drift > *max_drift {
            *max_drift = drift;
        }
        drop(max_drift);

        if drift.is_zero() {
            debug!(symbol, %internal_qty, %exchange_qty, "position reconciliation: exact match");
            self.successful_reconciliations.fetch_add(1, Ordering::Relaxed);
            return Ok(Decimal::ZERO);
        }

        if drift <= self.config.auto_correct_threshold {
            info!(symbol, %drift, %internal_qty, %exchange_qty, "small position drift, auto-correcting");
            self.successful_reconciliations.fetch_add(1, Ordering::Relaxed);
            return Ok(drift);
        }

        if drift > self.config.max_position_mismatch {
            error!(symbol, %drift, %internal_qty, %exchange_qty, "position mismatch exceeds threshold");
            self.failed_reconciliations.fetch_add(1, Ordering::Relaxed);
            if self.config.halt_on_mismatch {
                return Err(IntegrityError::CacheCorruption {
                    cache: "position",
                    reason: format!("{symbol}: drift {drift} exceeds max {}", self.config.max_position_mismatch),
                });
            }
        } else {
            warn!(symbol, %drift, %internal_qty, %exchange_qty, "position drift within tolerance");
            self.successful_reconciliations.fetch_add(1, Ordering::Relaxed);
        }

        Ok(drift)
    }

    pub fn force_reconciliation(&self) {
        self.fills_since_last_check
            .store(self.config.reconcile_every_n_fills as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ReconciliationStats {
        ReconciliationStats {
            successful: self.successful_reconciliations.load(Ordering::Relaxed),
            failed: self.failed_reconciliations.load(Ordering::Relaxed),
            total_drift: *self.total_drift_detected.lock(),
            max_drift: *self.max_drift_detected.lock(),
            fills_since_check: self.fills_since_last_check.load(Ordering::Relaxed),
            time_since_last: self.last_reconciliation.lock().elapsed(),
        }
    }
}

impl Default for PositionReconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of reconciliation history.
#[derive(Debug, Clone)]
pub struct ReconciliationStats {
    pub successful: u64,
    pub failed: u64,
    pub total_drift: Decimal,
    pub max_drift: Decimal,
    pub fills_since_check: u64,
    pub time_since_last: Duration,
}

impl ReconciliationStats {
    pub fn success_rate(&self) -> f64 {
        let total = self.successful + self.failed;
        if total == 0 {
            100.0
        } else {
            (self.successful as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn exact_match_counts_as_success_with_zero_drift() {
        let reconciler = PositionReconciler::new();
        let drift = reconciler.reconcile("BTCUSDT", dec!(1.5), dec!(1.5)).unwrap();
        assert_eq!(drift, Decimal::ZERO);
        assert_eq!(reconciler.stats().successful, 1);
    }

    #[test]
    fn small_drift_is_reported_but_not_an_error() {
        let reconciler = PositionReconciler::new();
        let drift = reconciler.reconcile("BTCUSDT", dec!(1.5), dec!(1.50005)).unwrap();
        assert_eq!(drift, dec!(0.00005));
    }

    #[test]
    fn large_drift_halts_when_configured_to() {
        let mut config = ReconciliationConfig::default();
        config.max_position_mismatch = dec!(0.001);
        config.halt_on_mismatch = true;
        let reconciler = PositionReconciler::with_config(config);
        let err = reconciler.reconcile("BTCUSDT", dec!(1.0), dec!(1.5)).unwrap_err();
        assert!(matches!(err, IntegrityError::CacheCorruption { .. }));
        assert_eq!(reconciler.stats().failed, 1);
    }

    #[test]
    fn fill_counter_trips_after_configured_count() {
        let mut config = ReconciliationConfig::default();
        config.reconcile_every_n_fills = 3;
        let reconciler = PositionReconciler::with_config(config);
        assert!(!reconciler.should_reconcile());
        reconciler.on_fill();
        reconciler.on_fill();
        assert!(!reconciler.should_reconcile());
        reconciler.on_fill();
        assert!(reconciler.should_reconcile());
    }
}
