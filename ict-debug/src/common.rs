//! Shared synthetic-candle generation for the debug CLIs. There is no
//! persisted candle history or running-process IPC to inspect (out of
//! scope); each tool regenerates the same deterministic history the
//! `ict-bins` binaries would have fed an engine, so the indicator cache and
//! condition-gate output it prints reflect real detector behavior rather
//! than canned data.

use ict_core::core::types::{Candle, UnixMillis};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const FIFTEEN_MIN_MS: i64 = 15 * 60 * 1000;

fn synthetic_candle(symbol: &str, interval: &str, index: u64, interval_ms: i64, base_price: Decimal) -> Candle {
    let offset = Decimal::from((index % 21) as i64 - 10) * dec!(5);
    let drift = Decimal::from((index % 7) as i64 - 3) * dec!(2);
    let open = base_price + offset;
    let close = open + drift;
    let high = open.max(close) + dec!(3);
    let low = open.min(close) - dec!(3);
    let open_time = UnixMillis::new(index as i64 * interval_ms);
    let close_time = UnixMillis::new(open_time.0 + interval_ms);
    Candle::new(symbol, interval, open_time, close_time, open, high, low, close, dec!(12), true)
        .expect("synthetic candle satisfies its own OHLC bounds by construction")
}

/// `count` synthetic 15m candles for `symbol`, starting at epoch zero.
pub fn synthetic_history(symbol: &str, interval: &str, count: usize) -> Vec<Candle> {
    (0..count as u64)
        .map(|i| synthetic_candle(symbol, interval, i, FIFTEEN_MIN_MS, dec!(50000)))
        .collect()
}
