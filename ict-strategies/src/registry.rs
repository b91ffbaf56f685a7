//! Static registry mapping determiner names to constructors, so a
//! [`ComposableStrategy`] can be assembled from config-driven names (e.g. a
//! CLI flag or a config file's `entry = "ict_entry"`) instead of the caller
//! hardwiring `Box::new(...)` calls. Grounded on `ModuleRegistry` in
//! `src/strategies/module_registry.py`, simplified for Rust: a
//! `std::sync::OnceLock`-backed table of function pointers rather than a
//! Pydantic-validated class registry, since static typing already rules out
//! most of what that validation existed to catch.

use crate::ict::entry::IctEntryDeterminer;
use crate::ict::exit::{ExitConfig, IctExitDeterminer};
use crate::ict::stop_loss::ZoneBasedStopLoss;
use crate::ict::take_profit::DisplacementTakeProfit;
use crate::percentage::PercentageStopLoss;
use crate::risk_reward::RiskRewardTakeProfit;
use ict_core::config::types::StrategyConfig;
use ict_core::strategy::{ComposableStrategy, EntryDeterminer, ExitDeterminer, StopLossDeterminer, TakeProfitDeterminer};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Interval convention every registered determiner builds against. Not part
/// of [`StrategyConfig`] — timeframes are left to the caller's symbol
/// wiring rather than baked into strategy parameters.
const MTF_INTERVAL: &str = "15m";
const HTF_INTERVAL: &str = "1h";

type EntryCtor = fn(&StrategyConfig) -> Box<dyn EntryDeterminer>;
type StopLossCtor = fn(&StrategyConfig) -> Box<dyn StopLossDeterminer>;
type TakeProfitCtor = fn(&StrategyConfig) -> Box<dyn TakeProfitDeterminer>;
type ExitCtor = fn(&StrategyConfig) -> Box<dyn ExitDeterminer>;

fn build_ict_entry(config: &StrategyConfig) -> Box<dyn EntryDeterminer> {
    Box::new(IctEntryDeterminer::new(
        MTF_INTERVAL,
        HTF_INTERVAL,
        config.swing_lookback,
        config.displacement_ratio,
        config.fvg_min_gap_percent,
        config.ob_min_strength,
        config.liquidity_tolerance,
        config.use_killzones,
    ))
}

fn build_percentage_sl(_config: &StrategyConfig) -> Box<dyn StopLossDeterminer> {
    Box::new(PercentageStopLoss::default())
}

fn build_zone_based_sl(config: &StrategyConfig) -> Box<dyn StopLossDeterminer> {
    Box::new(ZoneBasedStopLoss::new(MTF_INTERVAL, config.fvg_min_gap_percent, config.ob_min_strength))
}

fn build_risk_reward_tp(config: &StrategyConfig) -> Box<dyn TakeProfitDeterminer> {
    Box::new(RiskRewardTakeProfit::new(config.risk_reward_ratio))
}

fn build_displacement_tp(config: &StrategyConfig) -> Box<dyn TakeProfitDeterminer> {
    Box::new(DisplacementTakeProfit::new(MTF_INTERVAL, config.risk_reward_ratio, config.displacement_ratio))
}

fn build_ict_exit(config: &StrategyConfig) -> Box<dyn ExitDeterminer> {
    Box::new(IctExitDeterminer::new(
        MTF_INTERVAL,
        HTF_INTERVAL,
        config.swing_lookback,
        config.displacement_ratio,
        ExitConfig::default(),
    ))
}

/// Lookup table of every determiner this crate ships, keyed by name.
pub struct StrategyModuleRegistry {
    entry: HashMap<&'static str, EntryCtor>,
    stop_loss: HashMap<&'static str, StopLossCtor>,
    take_profit: HashMap<&'static str, TakeProfitCtor>,
    exit: HashMap<&'static str, ExitCtor>,
}

static REGISTRY: OnceLock<StrategyModuleRegistry> = OnceLock::new();

impl StrategyModuleRegistry {
    /// The process-wide registry, built on first access.
    pub fn global() -> &'static StrategyModuleRegistry {
        REGISTRY.get_or_init(Self::build)
    }

    fn build() -> Self {
        let mut entry: HashMap<&'static str, EntryCtor> = HashMap::new();
        entry.insert("ict_entry", build_ict_entry as EntryCtor);

        let mut stop_loss: HashMap<&'static str, StopLossCtor> = HashMap::new();
        stop_loss.insert("percentage", build_percentage_sl as StopLossCtor);
        stop_loss.insert("zone_based", build_zone_based_sl as StopLossCtor);

        let mut take_profit: HashMap<&'static str, TakeProfitCtor> = HashMap::new();
        take_profit.insert("risk_reward", build_risk_reward_tp as TakeProfitCtor);
        take_profit.insert("displacement", build_displacement_tp as TakeProfitCtor);

        let mut exit: HashMap<&'static str, ExitCtor> = HashMap::new();
        exit.insert("ict_exit", build_ict_exit as ExitCtor);

        Self { entry, stop_loss, take_profit, exit }
    }

    pub fn entry_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entry.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn stop_loss_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.stop_loss.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn take_profit_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.take_profit.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn exit_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.exit.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn build_entry(&self, name: &str, config: &StrategyConfig) -> Option<Box<dyn EntryDeterminer>> {
        self.entry.get(name).map(|ctor| ctor(config))
    }

    pub fn build_stop_loss(&self, name: &str, config: &StrategyConfig) -> Option<Box<dyn StopLossDeterminer>> {
        self.stop_loss.get(name).map(|ctor| ctor(config))
    }

    pub fn build_take_profit(&self, name: &str, config: &StrategyConfig) -> Option<Box<dyn TakeProfitDeterminer>> {
        self.take_profit.get(name).map(|ctor| ctor(config))
    }

    pub fn build_exit(&self, name: &str, config: &StrategyConfig) -> Option<Box<dyn ExitDeterminer>> {
        self.exit.get(name).map(|ctor| ctor(config))
    }

    /// Assemble a full [`ComposableStrategy`] from four registered names.
    /// Returns `None` if any name isn't registered.
    #[allow(clippy::too_many_arguments)]
    pub fn build_strategy(
        &self,
        strategy_name: impl Into<String>,
        entry: &str,
        stop_loss: &str,
        take_profit: &str,
        exit: &str,
        config: &StrategyConfig,
    ) -> Option<ComposableStrategy> {
        Some(ComposableStrategy {
            name: strategy_name.into(),
            entry: self.build_entry(entry, config)?,
            stop_loss: self.build_stop_loss(stop_loss, config)?,
            take_profit: self.build_take_profit(take_profit, config)?,
            exit: self.build_exit(exit, config)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ict_core::config::types::StrategyProfile;

    #[test]
    fn every_builtin_determiner_is_registered() {
        let registry = StrategyModuleRegistry::global();
        assert_eq!(registry.entry_names(), vec!["ict_entry"]);
        assert_eq!(registry.stop_loss_names(), vec!["percentage", "zone_based"]);
        assert_eq!(registry.take_profit_names(), vec!["displacement", "risk_reward"]);
        assert_eq!(registry.exit_names(), vec!["ict_exit"]);
    }

    #[test]
    fn unknown_names_build_nothing() {
        let registry = StrategyModuleRegistry::global();
        let config = StrategyConfig { profile: StrategyProfile::Balanced, ..StrategyConfig::default() };
        assert!(registry.build_stop_loss("does_not_exist", &config).is_none());
    }

    #[test]
    fn a_full_strategy_assembles_from_registered_names() {
        let registry = StrategyModuleRegistry::global();
        let config = StrategyConfig { profile: StrategyProfile::Balanced, ..StrategyConfig::default() };
        let strategy = registry
            .build_strategy("ict_balanced", "ict_entry", "zone_based", "displacement", "ict_exit", &config)
            .expect("all four names are registered");
        assert_eq!(strategy.name, "ict_balanced");
    }
}
