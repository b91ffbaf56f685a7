//! Concrete determiner implementations for the ICT strategy: entry, exit,
//! stop-loss, and take-profit modules built against the composable traits
//! in `ict_core::strategy`, plus the static module registry that assembles
//! them into a [`ict_core::strategy::ComposableStrategy`].
//!

pub mod ict;
pub mod percentage;
pub mod profiles;
pub mod registry;
pub mod risk_reward;

pub use ict::entry::IctEntryDeterminer;
pub use ict::exit::{ExitConfig, ExitStrategy, IctExitDeterminer};
pub use ict::stop_loss::ZoneBasedStopLoss;
pub use ict::take_profit::DisplacementTakeProfit;
pub use percentage::PercentageStopLoss;
pub use profiles::profile_config;
pub use registry::StrategyModuleRegistry;
pub use risk_reward::RiskRewardTakeProfit;
