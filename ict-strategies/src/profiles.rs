//! Strictness presets for the entry pipeline's confluence thresholds.
//! Grounded on `PROFILE_PARAMETERS` in `src/config/ict_profiles.py`.

use ict_core::config::types::{StrategyConfig, StrategyProfile};
use rust_decimal_macros::dec;

/// Resolve a [`StrategyProfile`] to its concrete parameter set.
///
/// - **Strict**: tight thresholds, roughly 1-2 signals/week.
/// - **Balanced**: the default, roughly 5-10 signals/week.
/// - **Relaxed**: loose thresholds, roughly 15-20 signals/week.
pub fn profile_config(profile: StrategyProfile) -> StrategyConfig {
    let mut config = StrategyConfig { profile, ..StrategyConfig::default() };
    match profile {
        StrategyProfile::Strict => {
            config.swing_lookback = 5;
            config.displacement_ratio = dec!(1.5);
            config.fvg_min_gap_percent = dec!(0.001);
            config.ob_min_strength = dec!(1.5);
            config.liquidity_tolerance = dec!(0.001);
            config.risk_reward_ratio = dec!(2.0);
        }
        StrategyProfile::Balanced => {
            config.swing_lookback = 5;
            config.displacement_ratio = dec!(1.3);
            config.fvg_min_gap_percent = dec!(0.001);
            config.ob_min_strength = dec!(1.3);
            config.liquidity_tolerance = dec!(0.002);
            config.risk_reward_ratio = dec!(2.0);
        }
        StrategyProfile::Relaxed => {
            config.swing_lookback = 3;
            config.displacement_ratio = dec!(1.1);
            config.fvg_min_gap_percent = dec!(0.0005);
            config.ob_min_strength = dec!(1.1);
            config.liquidity_tolerance = dec!(0.005);
            config.risk_reward_ratio = dec!(2.0);
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_is_tighter_than_relaxed() {
        let strict = profile_config(StrategyProfile::Strict);
        let relaxed = profile_config(StrategyProfile::Relaxed);
        assert!(strict.displacement_ratio > relaxed.displacement_ratio);
        assert!(strict.ob_min_strength > relaxed.ob_min_strength);
        assert!(strict.swing_lookback > relaxed.swing_lookback);
    }

    #[test]
    fn all_profiles_keep_the_same_reward_ratio() {
        assert_eq!(profile_config(StrategyProfile::Strict).risk_reward_ratio, dec!(2.0));
        assert_eq!(profile_config(StrategyProfile::Balanced).risk_reward_ratio, dec!(2.0));
        assert_eq!(profile_config(StrategyProfile::Relaxed).risk_reward_ratio, dec!(2.0));
    }
}
