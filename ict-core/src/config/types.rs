//! Runtime configuration types.
//!
//! Parsing these from a TOML/YAML file is out of scope; the types
//! themselves, and their programmatic validation via
//! [`crate::config::validator::ConfigValidator`], are in scope and are how
//! a caller (an `ict-bins` binary, a test) assembles an engine.

use crate::risk::types::RiskLimits;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub symbols: Vec<SymbolConfig>,
    pub risk: RiskLimits,
    pub execution: ExecutionConfig,
    pub strategy: StrategyConfig,
    pub bus: BusConfig,
    pub logging: LoggingConfig,
    pub audit: AuditConfig,
    pub liquidation: LiquidationConfig,
    /// Whether this config targets the exchange's testnet, which relaxes
    /// some of [`crate::config::validator::ConfigValidator`]'s bounds.
    #[serde(default)]
    pub testnet: bool,
}

/// Per-symbol trading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub symbol: String,
    /// Intervals to subscribe to beyond what the strategy's
    /// `ModuleRequirements` demands (e.g. a display-only higher timeframe).
    #[serde(default)]
    pub extra_intervals: Vec<String>,
    pub lot_size: Decimal,
    pub tick_size: Decimal,
    pub min_notional: Decimal,
    pub max_leverage: Decimal,
}

/// Execution mode: which [`crate::execution::OrderGateway`] the binary
/// wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Live,
    Paper,
    /// Deterministic dry run against the simulated gateway, no external
    /// connectivity at all.
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    /// Timeout for an order's fill confirmation before the engine falls
    /// back to a position/order reconciliation query.
    pub order_confirmation_timeout_ms: u64,
    #[serde(default)]
    pub starting_equity: Option<Decimal>,
}

/// Which determiner set a strategy profile selects, and its knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub profile: StrategyProfile,
    pub swing_lookback: usize,
    pub displacement_ratio: Decimal,
    pub fvg_min_gap_percent: Decimal,
    pub ob_min_strength: Decimal,
    pub liquidity_tolerance: Decimal,
    pub risk_reward_ratio: Decimal,
    pub use_killzones: bool,
    pub max_order_blocks: usize,
    pub max_fair_value_gaps: usize,
    pub indicator_expiry_candles: usize,
}

/// Strictness preset for entry-condition gating; see
/// `ict_strategies::profiles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyProfile {
    Strict,
    Balanced,
    Relaxed,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            profile: StrategyProfile::Balanced,
            swing_lookback: 5,
            displacement_ratio: dec!(1.5),
            fvg_min_gap_percent: dec!(0.001),
            ob_min_strength: dec!(1.5),
            liquidity_tolerance: dec!(0.001),
            risk_reward_ratio: dec!(2.0),
            use_killzones: true,
            max_order_blocks: 20,
            max_fair_value_gaps: 15,
            indicator_expiry_candles: 100,
        }
    }
}

/// Event bus queue capacity and backpressure behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub enabled: bool,
    pub directory: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true, directory: "logs/audit".to_string() }
    }
}

/// Governs [`crate::liquidation::LiquidationManager::execute_liquidation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationConfig {
    pub emergency_liquidation: bool,
    pub close_positions: bool,
    pub cancel_orders: bool,
    pub timeout_seconds: f64,
    pub max_retries: u32,
    pub retry_delay_seconds: f64,
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            emergency_liquidation: true,
            close_positions: true,
            cancel_orders: true,
            timeout_seconds: 5.0,
            max_retries: 3,
            retry_delay_seconds: 0.5,
        }
    }
}
