//! Programmatic configuration validation and deployment-readiness checks:
//! a standalone validation pass an operator runs before promoting a config
//! to production, rather than validation baked into a config loader
//! (which is out of scope).

use super::types::Config;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Severity of a single validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
    Critical,
}

/// Which configuration area a finding belongs to, for grouping in a
/// readiness report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    Symbols,
    Risk,
    Execution,
    Audit,
    Liquidation,
}

/// A single configuration finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub field: String,
    pub message: String,
    pub recommendation: String,
}

/// Aggregate report for `check_deployment_readiness`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReadinessReport {
    pub is_ready: bool,
    pub blockers: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
}

/// Runs a set of sanity rules against an assembled [`Config`].
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a config, returning every finding regardless of severity.
    pub fn validate(config: &Config) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if config.symbols.is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Critical,
                issue_type: IssueType::Symbols,
                field: "symbols".into(),
                message: "no symbols configured; engine would have nothing to trade".into(),
                recommendation: "add at least one entry to symbols".into(),
            });
        }

        let risk = &config.risk;
        if risk.max_risk_per_trade <= Decimal::ZERO || risk.max_risk_per_trade > Decimal::from(1) {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                issue_type: IssueType::Risk,
                field: "risk.max_risk_per_trade".into(),
                message: format!("{} is outside (0, 1]", risk.max_risk_per_trade),
                recommendation: "set max_risk_per_trade to a fraction of equity between 0 and 1".into(),
            });
        }
        if risk.max_risk_per_trade > rust_decimal_macros::dec!(0.05) {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                issue_type: IssueType::Risk,
                field: "risk.max_risk_per_trade".into(),
                message: format!("{} risks more than 5% of equity per trade", risk.max_risk_per_trade),
                recommendation: "consider lowering max_risk_per_trade toward 1-2% for production".into(),
            });
        }
        if risk.max_open_positions == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                issue_type: IssueType::Risk,
                field: "risk.max_open_positions".into(),
                message: "0 open positions allowed; engine can never enter a trade".into(),
                recommendation: "set max_open_positions to at least 1".into(),
            });
        }
        if risk.leverage > Decimal::from(20) {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                issue_type: IssueType::Risk,
                field: "risk.leverage".into(),
                message: format!("leverage {} is unusually high", risk.leverage),
                recommendation: "confirm the exchange and strategy tolerate this leverage before going live".into(),
            });
        }

        for symbol in &config.symbols {
            if symbol.lot_size <= Decimal::ZERO {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Critical,
                    issue_type: IssueType::Symbols,
                    field: format!("symbols[{}].lot_size", symbol.symbol),
                    message: "lot_size must be positive".into(),
                    recommendation: "fetch the exchange's actual lot size filter for this symbol".into(),
                });
            }
            if symbol.min_notional <= Decimal::ZERO {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Error,
                    issue_type: IssueType::Symbols,
                    field: format!("symbols[{}].min_notional", symbol.symbol),
                    message: "min_notional must be positive".into(),
                    recommendation: "fetch the exchange's actual min-notional filter for this symbol".into(),
                });
            }
        }

        if config.execution.order_confirmation_timeout_ms == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                issue_type: IssueType::Execution,
                field: "execution.order_confirmation_timeout_ms".into(),
                message: "a zero timeout means every order looks unconfirmed immediately".into(),
                recommendation: "set order_confirmation_timeout_ms to a positive value".into(),
            });
        }

        if matches!(config.execution.mode, super::types::ExecutionMode::Live) && config.execution.starting_equity.is_some() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Info,
                issue_type: IssueType::Execution,
                field: "execution.starting_equity".into(),
                message: "starting_equity is ignored in live mode; equity comes from the exchange".into(),
                recommendation: "remove starting_equity from the live config to avoid confusion".into(),
            });
        }

        if !config.audit.enabled {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                issue_type: IssueType::Audit,
                field: "audit.enabled".into(),
                message: "audit logging disabled; trade history will not be reconstructible after the fact".into(),
                recommendation: "enable audit logging before running against real funds".into(),
            });
        }

        issues.extend(Self::validate_liquidation(config));

        issues
    }

    /// Rules specific to [`super::types::LiquidationConfig`], split out
    /// since an operator may want to run just this check before flipping
    /// `emergency_liquidation` on in production.
    fn validate_liquidation(config: &Config) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let liq = &config.liquidation;

        if !liq.emergency_liquidation {
            issues.push(ValidationIssue {
                level: if config.testnet { ValidationLevel::Warning } else { ValidationLevel::Critical },
                issue_type: IssueType::Liquidation,
                field: "liquidation.emergency_liquidation".into(),
                message: "emergency liquidation disabled; shutdown will leave positions open".into(),
                recommendation: "enable emergency_liquidation before running against real funds".into(),
            });
            if liq.close_positions || liq.cancel_orders {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Critical,
                    issue_type: IssueType::Liquidation,
                    field: "liquidation".into(),
                    message: "emergency_liquidation=false but close_positions/cancel_orders is still set; these must both be false together".into(),
                    recommendation: "set close_positions and cancel_orders to false, or enable emergency_liquidation".into(),
                });
            }
        } else if !config.testnet && !liq.close_positions && !liq.cancel_orders {
            issues.push(ValidationIssue {
                level: ValidationLevel::Critical,
                issue_type: IssueType::Liquidation,
                field: "liquidation".into(),
                message: "emergency_liquidation is enabled but neither close_positions nor cancel_orders would run".into(),
                recommendation: "enable close_positions and/or cancel_orders so shutdown actually does something".into(),
            });
        }

        if !config.testnet {
            if liq.timeout_seconds < 3.0 {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Error,
                    issue_type: IssueType::Liquidation,
                    field: "liquidation.timeout_seconds".into(),
                    message: format!("{}s is too tight for a reliable emergency close", liq.timeout_seconds),
                    recommendation: "raise liquidation.timeout_seconds to at least 3s".into(),
                });
            }
            if liq.timeout_seconds > 30.0 {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    issue_type: IssueType::Liquidation,
                    field: "liquidation.timeout_seconds".into(),
                    message: format!("{}s is unusually long for shutdown to block on", liq.timeout_seconds),
                    recommendation: "lower liquidation.timeout_seconds unless a slow shutdown is acceptable".into(),
                });
            }
            if !(1..=5).contains(&liq.max_retries) {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    issue_type: IssueType::Liquidation,
                    field: "liquidation.max_retries".into(),
                    message: format!("{} retries is outside the recommended [1, 5]", liq.max_retries),
                    recommendation: "set liquidation.max_retries between 1 and 5".into(),
                });
            }
        }

        let worst_case = liq.timeout_seconds.max(liq.retry_delay_seconds * f64::from(liq.max_retries));
        if worst_case > 30.0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                issue_type: IssueType::Liquidation,
                field: "liquidation".into(),
                message: format!("worst-case liquidation time ~{worst_case:.1}s exceeds 30s"),
                recommendation: "lower timeout_seconds, retry_delay_seconds, or max_retries so the worst case stays under 30s".into(),
            });
        }

        issues
    }

    /// Convenience entry point: validate and report whether the config is
    /// safe to deploy (no Error/Critical findings).
    pub fn check_deployment_readiness(config: &Config) -> DeploymentReadinessReport {
        let issues = Self::validate(config);
        let blockers: Vec<_> = issues
            .iter()
            .filter(|i| matches!(i.level, ValidationLevel::Error | ValidationLevel::Critical))
            .cloned()
            .collect();
        let warnings: Vec<_> = issues.iter().filter(|i| i.level == ValidationLevel::Warning).cloned().collect();
        let recommendations = blockers.iter().chain(warnings.iter()).map(|i| i.recommendation.clone()).collect();
        DeploymentReadinessReport { is_ready: blockers.is_empty(), blockers, warnings, recommendations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{AuditConfig, BusConfig, ExecutionConfig, ExecutionMode, LiquidationConfig, LoggingConfig, StrategyConfig, SymbolConfig};
    use crate::risk::types::RiskLimits;
    use rust_decimal_macros::dec;

    fn base_config() -> Config {
        Config {
            symbols: vec![SymbolConfig {
                symbol: "BTCUSDT".into(),
                extra_intervals: vec![],
                lot_size: dec!(0.001),
                tick_size: dec!(0.01),
                min_notional: dec!(5),
                max_leverage: dec!(20),
            }],
            risk: RiskLimits::default(),
            execution: ExecutionConfig {
                mode: ExecutionMode::Simulated,
                order_confirmation_timeout_ms: 5000,
                starting_equity: Some(dec!(10000)),
            },
            strategy: StrategyConfig::default(),
            bus: BusConfig::default(),
            logging: LoggingConfig::default(),
            audit: AuditConfig::default(),
            liquidation: LiquidationConfig::default(),
            testnet: true,
        }
    }

    #[test]
    fn a_sane_config_is_deployment_ready() {
        let report = ConfigValidator::check_deployment_readiness(&base_config());
        assert!(report.is_ready, "{:?}", report.blockers);
    }

    #[test]
    fn empty_symbols_blocks_deployment() {
        let mut config = base_config();
        config.symbols.clear();
        let report = ConfigValidator::check_deployment_readiness(&config);
        assert!(!report.is_ready);
        assert_eq!(report.blockers.len(), 1);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn disabled_emergency_liquidation_blocks_production_deployment() {
        let mut config = base_config();
        config.testnet = false;
        config.liquidation.emergency_liquidation = false;
        config.liquidation.close_positions = false;
        config.liquidation.cancel_orders = false;
        let report = ConfigValidator::check_deployment_readiness(&config);
        assert!(!report.is_ready);
        assert!(report.blockers.iter().any(|i| i.field == "liquidation.emergency_liquidation"));
    }

    #[test]
    fn disabled_emergency_liquidation_is_only_a_warning_on_testnet() {
        let mut config = base_config();
        config.liquidation.emergency_liquidation = false;
        config.liquidation.close_positions = false;
        config.liquidation.cancel_orders = false;
        let report = ConfigValidator::check_deployment_readiness(&config);
        assert!(report.is_ready, "{:?}", report.blockers);
        assert!(report.warnings.iter().any(|i| i.field == "liquidation.emergency_liquidation"));
    }

    #[test]
    fn high_risk_per_trade_is_a_warning_not_a_blocker() {
        let mut config = base_config();
        config.risk.max_risk_per_trade = dec!(0.1);
        let report = ConfigValidator::check_deployment_readiness(&config);
        assert!(report.is_ready);
        assert!(report.warnings.iter().any(|i| i.issue_type == IssueType::Risk));
    }
}
