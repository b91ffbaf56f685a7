//! Structured JSON Lines audit trail for every order, risk decision, and
//! retry the engine makes. Grounded on `src/core/audit_logger.py`'s
//! `AuditLogger`/`AuditEventType`, extended with the signal-processing and
//! liquidation event kinds this system's risk and liquidation modules add.

use crate::core::errors::ConfigurationError;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    OrderPlaced,
    OrderRejected,
    OrderCanceled,
    RetryAttempt,
    RateLimit,
    SignalProcessing,
    RiskRejection,
    RiskValidation,
    PositionSizeCalculated,
    PositionSizeCapped,
    TradeExecuted,
    TradeExecutionFailed,
    TradeClosed,
    LiquidationComplete,
    ApiError,
    PositionClosed,
}

impl AuditEventType {
    fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::OrderPlaced => "order_placed",
            AuditEventType::OrderRejected => "order_rejected",
            AuditEventType::OrderCanceled => "order_cancelled",
            AuditEventType::RetryAttempt => "retry_attempt",
            AuditEventType::RateLimit => "rate_limit",
            AuditEventType::SignalProcessing => "signal_processing",
            AuditEventType::RiskRejection => "risk_rejection",
            AuditEventType::RiskValidation => "risk_validation",
            AuditEventType::PositionSizeCalculated => "position_size_calculated",
            AuditEventType::PositionSizeCapped => "position_size_capped",
            AuditEventType::TradeExecuted => "trade_executed",
            AuditEventType::TradeExecutionFailed => "trade_execution_failed",
            AuditEventType::TradeClosed => "trade_closed",
            AuditEventType::LiquidationComplete => "liquidation_complete",
            AuditEventType::ApiError => "api_error",
            AuditEventType::PositionClosed => "position_closed",
        }
    }
}

/// Fields accompanying an audit event; all optional, mirroring the
/// original's keyword-argument `log_event`.
#[derive(Debug, Clone, Default)]
pub struct AuditFields {
    pub symbol: Option<String>,
    pub order_data: Option<Value>,
    pub response: Option<Value>,
    pub error: Option<Value>,
    pub retry_attempt: Option<u32>,
    pub additional_data: Option<Value>,
}

/// Appends one JSON object per line to a daily-rotated audit log file.
pub struct AuditLogger {
    file: Mutex<File>,
}

impl AuditLogger {
    /// Open (or create) today's audit log under `log_dir`.
    pub fn new(log_dir: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)
            .map_err(|e| ConfigurationError::Conflict { reason: format!("could not create audit log directory {}: {e}", log_dir.display()) })?;
        let file_name = format!("audit_{}.jsonl", Utc::now().format("%Y%m%d"));
        let path: PathBuf = log_dir.join(file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ConfigurationError::Conflict { reason: format!("could not open audit log {}: {e}", path.display()) })?;
        Ok(Self { file: Mutex::new(file) })
    }

    pub fn log_event(&self, event_type: AuditEventType, operation: &str, fields: AuditFields) {
        let mut event = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": event_type.as_str(),
            "operation": operation,
        });
        let obj = event.as_object_mut().expect("constructed as an object literal above");
        if let Some(symbol) = fields.symbol {
            obj.insert("symbol".to_string(), json!(symbol));
        }
        if let Some(order_data) = fields.order_data {
            obj.insert("order_data".to_string(), order_data);
        }
        if let Some(response) = fields.response {
            obj.insert("response".to_string(), response);
        }
        if let Some(error) = fields.error {
            obj.insert("error".to_string(), error);
        }
        if let Some(retry_attempt) = fields.retry_attempt {
            obj.insert("retry_attempt".to_string(), json!(retry_attempt));
        }
        if let Some(additional_data) = fields.additional_data {
            obj.insert("additional_data".to_string(), additional_data);
        }

        let line = event.to_string();
        let mut file = self.file.lock().expect("audit log mutex poisoned");
        if let Err(e) = writeln!(file, "{line}") {
            tracing::warn!(%e, "failed to write audit log entry");
        }
    }

    pub fn log_order_placed(&self, symbol: &str, order_data: Value, response: Value) {
        self.log_event(
            AuditEventType::OrderPlaced,
            "place_order",
            AuditFields { symbol: Some(symbol.to_string()), order_data: Some(order_data), response: Some(response), ..Default::default() },
        );
    }

    pub fn log_order_rejected(&self, symbol: &str, order_data: Value, error: Value) {
        self.log_event(
            AuditEventType::OrderRejected,
            "place_order",
            AuditFields { symbol: Some(symbol.to_string()), order_data: Some(order_data), error: Some(error), ..Default::default() },
        );
    }

    pub fn log_risk_rejection(&self, symbol: &str, reason: &str) {
        self.log_event(
            AuditEventType::RiskRejection,
            "validate_signal",
            AuditFields { symbol: Some(symbol.to_string()), additional_data: Some(json!({"reason": reason})), ..Default::default() },
        );
    }
}

/// A `NoOpAuditLogger` substitute for tests that don't want to touch the
/// filesystem; the real [`AuditLogger`] is always backed by a file.
pub struct NullAuditLogger;

impl NullAuditLogger {
    pub fn log_event(&self, _event_type: AuditEventType, _operation: &str, _fields: AuditFields) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as Json;
    use std::io::{BufRead, BufReader};

    #[test]
    fn logs_an_event_as_a_single_json_line() {
        let dir = std::env::temp_dir().join(format!("ict-audit-test-{}", std::process::id()));
        let logger = AuditLogger::new(&dir).unwrap();
        logger.log_order_placed("BTCUSDT", json!({"side": "BUY"}), json!({"orderId": 1}));

        let file_name = format!("audit_{}.jsonl", Utc::now().format("%Y%m%d"));
        let contents = fs::read_to_string(dir.join(file_name)).unwrap();
        let mut lines = BufReader::new(contents.as_bytes()).lines();
        let line = lines.next().unwrap().unwrap();
        let parsed: Json = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event_type"], "order_placed");
        assert_eq!(parsed["symbol"], "BTCUSDT");

        fs::remove_dir_all(&dir).ok();
    }
}
