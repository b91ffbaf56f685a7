//! Builders for the domain types tests construct most often, so individual
//! test modules don't each hand-roll a 10-field `Candle`/`Signal` literal.

use crate::core::types::{
    Candle, Position, PositionSide, Signal, SignalKind, UnixMillis,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Build a closed candle with a flat OHLC at `price` and the given volume.
pub fn flat_candle(symbol: &str, interval: &str, open_time: i64, price: Decimal, volume: Decimal) -> Candle {
    Candle::new(
        symbol,
        interval,
        UnixMillis(open_time),
        UnixMillis(open_time + 1),
        price,
        price,
        price,
        price,
        volume,
        true,
    )
    .expect("flat candle always satisfies OHLC invariants")
}

/// Build a candle with distinct open/high/low/close, still invariant-valid.
#[allow(clippy::too_many_arguments)]
pub fn ohlc_candle(
    symbol: &str,
    interval: &str,
    open_time: i64,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
) -> Candle {
    Candle::new(symbol, interval, UnixMillis(open_time), UnixMillis(open_time + 1), open, high, low, close, dec!(10), true)
        .expect("test candle must satisfy OHLC invariants")
}

/// A long entry signal with a sane TP/SL around `entry`.
pub fn long_entry_signal(symbol: &str, entry: Decimal) -> Signal {
    Signal {
        kind: SignalKind::LongEntry,
        symbol: symbol.to_string(),
        entry_price: entry,
        take_profit: Some(entry * dec!(1.02)),
        stop_loss: Some(entry * dec!(0.99)),
        strategy_name: "test".to_string(),
        timestamp: UnixMillis(0),
        confidence: 0.8,
        exit_reason: None,
        metadata: HashMap::new(),
    }
}

/// A short entry signal with a sane TP/SL around `entry`.
pub fn short_entry_signal(symbol: &str, entry: Decimal) -> Signal {
    Signal {
        kind: SignalKind::ShortEntry,
        symbol: symbol.to_string(),
        entry_price: entry,
        take_profit: Some(entry * dec!(0.98)),
        stop_loss: Some(entry * dec!(1.01)),
        strategy_name: "test".to_string(),
        timestamp: UnixMillis(0),
        confidence: 0.8,
        exit_reason: None,
        metadata: HashMap::new(),
    }
}

/// A long position opened at `entry_price` for `quantity`.
pub fn long_position(symbol: &str, entry_price: Decimal, quantity: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        side: PositionSide::Long,
        entry_price,
        quantity,
        leverage: dec!(5),
        unrealized_pnl: Decimal::ZERO,
        liquidation_price: None,
        entry_time: Some(UnixMillis(0)),
    }
}
