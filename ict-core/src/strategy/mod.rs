//! Composable strategy framework.
//!
//! A [`ComposableStrategy`] is four independently pluggable determiners —
//! entry, stop-loss, take-profit, and exit — rather than one monolithic
//! `Strategy` implementation. Each determiner declares its own
//! [`ModuleRequirements`] (intervals and minimum candle counts it needs);
//! the strategy merges them so the engine knows exactly what history to
//! keep warm before the strategy may run.
//!
//! Determiner code is CPU-only and must not suspend: these traits are
//! deliberately synchronous even though the rest of the engine is async.

pub mod buffers;

use crate::core::errors::ValidationError;
use crate::core::types::{Candle, ModuleRequirements, Position, PositionSide, Signal};
use crate::indicator_cache::IndicatorStateCache;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Read-only view handed to determiners: the candle history (by interval)
/// the strategy has buffered, plus the shared indicator cache.
pub struct StrategyContext<'a> {
    pub symbol: &'a str,
    pub candles: &'a HashMap<String, Vec<Candle>>,
    pub indicators: &'a IndicatorStateCache,
}

impl<'a> StrategyContext<'a> {
    pub fn latest(&self, interval: &str) -> Option<&Candle> {
        self.candles.get(interval).and_then(|c| c.last())
    }
}

/// Context available when deciding whether, and how, to enter a position.
pub struct EntryContext<'a> {
    pub base: StrategyContext<'a>,
}

/// An entry determiner's decision.
#[derive(Debug, Clone)]
pub enum EntryDecision {
    /// No entry this bar.
    NoEntry,
    /// Enter with the given direction and anchor price; stop-loss and
    /// take-profit determiners fill in the brackets afterward.
    Enter { side: PositionSide, entry_price: Decimal, confidence: f64 },
}

/// Context available when placing a stop-loss or take-profit for a
/// newly-decided entry.
pub struct PriceContext<'a> {
    pub base: StrategyContext<'a>,
    pub side: PositionSide,
    pub entry_price: Decimal,
}

/// Context available when deciding whether to exit an open position.
pub struct ExitContext<'a> {
    pub base: StrategyContext<'a>,
    pub position: &'a Position,
    pub current_price: Decimal,
}

/// An exit determiner's decision.
#[derive(Debug, Clone)]
pub enum ExitDecision {
    Hold,
    Exit { reason: String },
}

/// Decides whether market structure currently warrants a new entry.
pub trait EntryDeterminer: Send + Sync {
    fn name(&self) -> &str;
    fn requirements(&self) -> ModuleRequirements;
    fn decide(&self, ctx: &EntryContext) -> EntryDecision;
}

/// Computes the stop-loss price for a freshly decided entry.
pub trait StopLossDeterminer: Send + Sync {
    fn name(&self) -> &str;
    fn requirements(&self) -> ModuleRequirements;
    fn compute(&self, ctx: &PriceContext) -> Decimal;
}

/// Computes the take-profit price for a freshly decided entry. Receives the
/// stop-loss already computed for this entry — reward sizing is defined
/// relative to risk distance, not independently of it.
pub trait TakeProfitDeterminer: Send + Sync {
    fn name(&self) -> &str;
    fn requirements(&self) -> ModuleRequirements;
    fn compute(&self, ctx: &PriceContext, stop_loss: Decimal) -> Decimal;
}

/// Decides whether an open position should be closed early (ahead of its
/// resting TP/SL orders being hit).
pub trait ExitDeterminer: Send + Sync {
    fn name(&self) -> &str;
    fn requirements(&self) -> ModuleRequirements;
    fn decide(&self, ctx: &ExitContext) -> ExitDecision;
}

/// Declares which four determiners compose a strategy, and how entries turn
/// into validated [`Signal`]s.
pub struct ComposableStrategy {
    pub name: String,
    pub entry: Box<dyn EntryDeterminer>,
    pub stop_loss: Box<dyn StopLossDeterminer>,
    pub take_profit: Box<dyn TakeProfitDeterminer>,
    pub exit: Box<dyn ExitDeterminer>,
}

impl fmt::Debug for ComposableStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposableStrategy")
            .field("name", &self.name)
            .field("entry", &self.entry.name())
            .field("stop_loss", &self.stop_loss.name())
            .field("take_profit", &self.take_profit.name())
            .field("exit", &self.exit.name())
            .finish()
    }
}

impl ComposableStrategy {
    /// Union of all four determiners' data requirements: the candle history
    /// the engine must keep buffered before this strategy may run.
    pub fn requirements(&self) -> ModuleRequirements {
        let reqs = [
            self.entry.requirements(),
            self.stop_loss.requirements(),
            self.take_profit.requirements(),
            self.exit.requirements(),
        ];
        ModuleRequirements::merge(&reqs)
    }

    /// Run the entry pipeline: ask the entry determiner for a direction,
    /// then ask the bracket determiners for TP/SL, then validate the
    /// resulting [`Signal`] before returning it.
    pub fn evaluate_entry(
        &self,
        symbol: &str,
        candles: &HashMap<String, Vec<Candle>>,
        indicators: &IndicatorStateCache,
        timestamp: crate::core::types::UnixMillis,
    ) -> Result<Option<Signal>, ValidationError> {
        let base = StrategyContext { symbol, candles, indicators };
        let entry_ctx = EntryContext { base };
        let decision = self.entry.decide(&entry_ctx);

        let (side, entry_price, confidence) = match decision {
            EntryDecision::NoEntry => return Ok(None),
            EntryDecision::Enter { side, entry_price, confidence } => (side, entry_price, confidence),
        };

        let base = StrategyContext { symbol, candles, indicators };
        let price_ctx = PriceContext { base, side, entry_price };
        let stop_loss = self.stop_loss.compute(&price_ctx);
        let take_profit = self.take_profit.compute(&price_ctx, stop_loss);

        let kind = match side {
            PositionSide::Long => crate::core::types::SignalKind::LongEntry,
            PositionSide::Short => crate::core::types::SignalKind::ShortEntry,
        };

        let signal = Signal {
            kind,
            symbol: symbol.to_string(),
            entry_price,
            take_profit: Some(take_profit),
            stop_loss: Some(stop_loss),
            strategy_name: self.name.clone(),
            timestamp,
            confidence,
            exit_reason: None,
            metadata: HashMap::new(),
        };
        signal.validate_tp_sl_ordering()?;
        Ok(Some(signal))
    }

    /// Run the exit pipeline for an open position.
    pub fn evaluate_exit(
        &self,
        symbol: &str,
        candles: &HashMap<String, Vec<Candle>>,
        indicators: &IndicatorStateCache,
        position: &Position,
        current_price: Decimal,
        timestamp: crate::core::types::UnixMillis,
    ) -> Option<Signal> {
        let base = StrategyContext { symbol, candles, indicators };
        let ctx = ExitContext { base, position, current_price };
        let decision = self.exit.decide(&ctx);

        let reason = match decision {
            ExitDecision::Hold => return None,
            ExitDecision::Exit { reason } => reason,
        };

        let kind = match position.side {
            PositionSide::Long => crate::core::types::SignalKind::CloseLong,
            PositionSide::Short => crate::core::types::SignalKind::CloseShort,
        };

        Some(Signal {
            kind,
            symbol: symbol.to_string(),
            entry_price: current_price,
            take_profit: None,
            stop_loss: None,
            strategy_name: self.name.clone(),
            timestamp,
            confidence: 1.0,
            exit_reason: Some(reason),
            metadata: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct AlwaysLong;
    impl EntryDeterminer for AlwaysLong {
        fn name(&self) -> &str {
            "always_long"
        }
        fn requirements(&self) -> ModuleRequirements {
            ModuleRequirements::single("5m", 1)
        }
        fn decide(&self, _ctx: &EntryContext) -> EntryDecision {
            EntryDecision::Enter {
                side: PositionSide::Long,
                entry_price: dec!(100),
                confidence: 0.9,
            }
        }
    }

    struct FixedSl(Decimal);
    impl StopLossDeterminer for FixedSl {
        fn name(&self) -> &str {
            "fixed_sl"
        }
        fn requirements(&self) -> ModuleRequirements {
            ModuleRequirements::default()
        }
        fn compute(&self, ctx: &PriceContext) -> Decimal {
            ctx.entry_price - self.0
        }
    }

    struct FixedTp(Decimal);
    impl TakeProfitDeterminer for FixedTp {
        fn name(&self) -> &str {
            "fixed_tp"
        }
        fn requirements(&self) -> ModuleRequirements {
            ModuleRequirements::default()
        }
        fn compute(&self, ctx: &PriceContext, _stop_loss: Decimal) -> Decimal {
            ctx.entry_price + self.0
        }
    }

    struct NeverExit;
    impl ExitDeterminer for NeverExit {
        fn name(&self) -> &str {
            "never_exit"
        }
        fn requirements(&self) -> ModuleRequirements {
            ModuleRequirements::default()
        }
        fn decide(&self, _ctx: &ExitContext) -> ExitDecision {
            ExitDecision::Hold
        }
    }

    #[test]
    fn evaluate_entry_produces_validated_signal() {
        let strategy = ComposableStrategy {
            name: "test".into(),
            entry: Box::new(AlwaysLong),
            stop_loss: Box::new(FixedSl(dec!(5))),
            take_profit: Box::new(FixedTp(dec!(10))),
            exit: Box::new(NeverExit),
        };
        let candles = HashMap::new();
        let indicators = IndicatorStateCache::new(20, 15);
        let signal = strategy
            .evaluate_entry("BTCUSDT", &candles, &indicators, crate::core::types::UnixMillis(0))
            .unwrap()
            .unwrap();
        assert_eq!(signal.entry_price, dec!(100));
        assert_eq!(signal.stop_loss, Some(dec!(95)));
        assert_eq!(signal.take_profit, Some(dec!(110)));
    }

    #[test]
    fn requirements_merge_across_all_four_determiners() {
        let strategy = ComposableStrategy {
            name: "test".into(),
            entry: Box::new(AlwaysLong),
            stop_loss: Box::new(FixedSl(dec!(5))),
            take_profit: Box::new(FixedTp(dec!(10))),
            exit: Box::new(NeverExit),
        };
        let reqs = strategy.requirements();
        assert_eq!(reqs.min_candles.get("5m"), Some(&1));
    }
}
