//! Domain types for the trading core.
//!
//! All prices, quantities, and ratios are [`Decimal`] — never `f64` — so that
//! position sizing and bracket placement never silently drift from exchange
//! precision. Timestamps are monotonic UTC milliseconds since epoch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Milliseconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixMillis(pub i64);

impl UnixMillis {
    pub const fn new(ms: i64) -> Self {
        Self(ms)
    }

    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn duration_since(self, earlier: UnixMillis) -> i64 {
        self.0 - earlier.0
    }
}

impl fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Position side. Distinct from [`Side`] (order side) because a closing
/// order's side is the opposite of the position it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// The order side that would close a position on this side.
    pub const fn closing_order_side(self) -> Side {
        match self {
            PositionSide::Long => Side::Sell,
            PositionSide::Short => Side::Buy,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Order type, matching the exchange's perpetual-futures order kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    TakeProfitMarket,
    StopLimit,
    TakeProfitLimit,
    TrailingStopMarket,
}

impl OrderType {
    /// Whether this order kind requires a limit price.
    pub const fn requires_price(self) -> bool {
        matches!(self, OrderType::Limit | OrderType::StopLimit | OrderType::TakeProfitLimit)
    }

    /// Whether this order kind requires a stop/trigger price.
    pub const fn requires_stop_price(self) -> bool {
        matches!(
            self,
            OrderType::StopMarket
                | OrderType::TakeProfitMarket
                | OrderType::StopLimit
                | OrderType::TakeProfitLimit
                | OrderType::TrailingStopMarket
        )
    }
}

/// Order lifecycle status, as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

/// Margin mode for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarginType {
    Isolated,
    Cross,
}

/// Immutable OHLCV record for a (symbol, interval) pair.
///
/// Invariants (validated at construction): `low <= min(open, close, high)`,
/// `high >= max(open, close, low)`, `volume >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub interval: String,
    pub open_time: UnixMillis,
    pub close_time: UnixMillis,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Live ticks have `is_closed = false` and must never be appended to a
    /// strategy buffer; they exist only for cache/UI consumption.
    pub is_closed: bool,
}

impl Candle {
    /// Construct a candle, rejecting OHLC/volume invariant violations.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        open_time: UnixMillis,
        close_time: UnixMillis,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        is_closed: bool,
    ) -> Result<Self, crate::core::errors::ValidationError> {
        let lowest = open.min(close).min(high);
        let highest = open.max(close).max(low);
        if low > lowest {
            return Err(crate::core::errors::ValidationError::BadOhlcBounds {
                reason: format!("low {low} exceeds min(open, close, high) {lowest}"),
            });
        }
        if high < highest {
            return Err(crate::core::errors::ValidationError::BadOhlcBounds {
                reason: format!("high {high} below max(open, close, low) {highest}"),
            });
        }
        if volume < Decimal::ZERO {
            return Err(crate::core::errors::ValidationError::BadOhlcBounds {
                reason: format!("volume {volume} is negative"),
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            interval: interval.into(),
            open_time,
            close_time,
            open,
            high,
            low,
            close,
            volume,
            is_closed,
        })
    }

    pub fn midpoint(&self) -> Decimal {
        (self.high + self.low) / Decimal::TWO
    }

    /// Candle range as a fraction of close price; used by displacement checks.
    pub fn range_percent(&self) -> Decimal {
        if self.close.is_zero() {
            return Decimal::ZERO;
        }
        (self.high - self.low) / self.close
    }
}

/// The kind of decision a strategy has produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    LongEntry,
    ShortEntry,
    CloseLong,
    CloseShort,
}

impl SignalKind {
    pub const fn is_entry(self) -> bool {
        matches!(self, SignalKind::LongEntry | SignalKind::ShortEntry)
    }

    pub const fn is_exit(self) -> bool {
        !self.is_entry()
    }

    pub const fn position_side(self) -> PositionSide {
        match self {
            SignalKind::LongEntry | SignalKind::CloseLong => PositionSide::Long,
            SignalKind::ShortEntry | SignalKind::CloseShort => PositionSide::Short,
        }
    }
}

/// The strategy's decision: enter, or exit an existing position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub symbol: String,
    pub entry_price: Decimal,
    /// Required for entries, absent for exits.
    pub take_profit: Option<Decimal>,
    /// Required for entries, absent for exits.
    pub stop_loss: Option<Decimal>,
    pub strategy_name: String,
    pub timestamp: UnixMillis,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub exit_reason: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl Signal {
    /// Validate the TP/SL ordering invariant: for LongEntry `TP > entry >
    /// SL`; for ShortEntry `SL > entry > TP`. Exit signals carry no TP/SL
    /// and always pass.
    pub fn validate_tp_sl_ordering(&self) -> Result<(), crate::core::errors::ValidationError> {
        if self.kind.is_exit() {
            return Ok(());
        }
        let tp = self
            .take_profit
            .ok_or(crate::core::errors::ValidationError::MissingBracket { which: "take_profit" })?;
        let sl = self
            .stop_loss
            .ok_or(crate::core::errors::ValidationError::MissingBracket { which: "stop_loss" })?;
        let ok = match self.kind {
            SignalKind::LongEntry => tp > self.entry_price && self.entry_price > sl,
            SignalKind::ShortEntry => sl > self.entry_price && self.entry_price > tp,
            _ => unreachable!("exit signals handled above"),
        };
        if !ok {
            return Err(crate::core::errors::ValidationError::TpSlWrongSide {
                kind: format!("{:?}", self.kind),
                entry: self.entry_price,
                take_profit: tp,
                stop_loss: sl,
            });
        }
        Ok(())
    }

    /// Realized risk-reward ratio = reward distance / risk distance.
    pub fn risk_reward_ratio(&self) -> Option<Decimal> {
        let tp = self.take_profit?;
        let sl = self.stop_loss?;
        let risk = (self.entry_price - sl).abs();
        if risk.is_zero() {
            return None;
        }
        Some((tp - self.entry_price).abs() / risk)
    }
}

/// A request for, or observed state of, an exchange order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    pub reduce_only: bool,
}

impl Order {
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            status: OrderStatus::New,
            filled_quantity: Decimal::ZERO,
            reduce_only: false,
        }
    }

    pub fn reduce_only_bracket(
        symbol: impl Into<String>,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        stop_price: Decimal,
    ) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            price: None,
            stop_price: Some(stop_price),
            status: OrderStatus::New,
            filled_quantity: Decimal::ZERO,
            reduce_only: true,
        }
    }
}

/// Live exposure for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    /// Volume-weighted average entry price.
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub leverage: Decimal,
    pub unrealized_pnl: Decimal,
    pub liquidation_price: Option<Decimal>,
    pub entry_time: Option<UnixMillis>,
}

impl Position {
    pub fn notional(&self) -> Decimal {
        self.quantity * self.entry_price
    }

    pub fn margin_used(&self) -> Decimal {
        if self.leverage.is_zero() {
            return Decimal::ZERO;
        }
        self.notional() / self.leverage
    }
}

/// Last recorded open of a position; used to compute realized PnL and
/// holding duration when a TP/SL fill later closes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEntryData {
    pub symbol: String,
    pub side: PositionSide,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub entry_time: UnixMillis,
}

/// Direction of an ICT imbalance or order block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneDirection {
    Bullish,
    Bearish,
}

/// Lifecycle status of a tracked FVG/OB zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneStatus {
    Active,
    Touched,
    Mitigated,
    Filled,
    Invalidated,
}

/// 3-candle imbalance left behind by a displacement move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairValueGap {
    pub direction: ZoneDirection,
    pub gap_low: Decimal,
    pub gap_high: Decimal,
    pub formation_time: UnixMillis,
    pub formation_index: usize,
    pub status: ZoneStatus,
    pub fill_percent: f64,
}

impl FairValueGap {
    pub fn midpoint(&self) -> Decimal {
        (self.gap_low + self.gap_high) / Decimal::TWO
    }

    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.gap_low && price <= self.gap_high
    }
}

/// Last opposite candle before a displacement; a supply/demand zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBlock {
    pub direction: ZoneDirection,
    pub high: Decimal,
    pub low: Decimal,
    pub displacement_size: Decimal,
    pub strength: Decimal,
    pub status: ZoneStatus,
    pub formation_time: UnixMillis,
    pub formation_index: usize,
}

impl OrderBlock {
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.low && price <= self.high
    }
}

/// Trend direction for a given interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

/// Per-interval trend snapshot with the swings that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStructure {
    pub interval: String,
    pub trend: Trend,
    pub last_swing_high: Option<Decimal>,
    pub last_swing_low: Option<Decimal>,
}

/// Frozen declaration of the data a determiner consumes: the set of
/// intervals and the minimum candle count required per interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRequirements {
    pub min_candles: HashMap<String, usize>,
}

impl ModuleRequirements {
    pub fn single(interval: impl Into<String>, min_candles: usize) -> Self {
        let mut map = HashMap::new();
        map.insert(interval.into(), min_candles);
        Self { min_candles: map }
    }

    pub fn intervals(&self) -> impl Iterator<Item = &str> {
        self.min_candles.keys().map(String::as_str)
    }

    /// Merge a set of requirements: union of intervals, max of per-interval
    /// minimum candle counts.
    pub fn merge<'a>(reqs: impl IntoIterator<Item = &'a ModuleRequirements>) -> ModuleRequirements {
        let mut merged: HashMap<String, usize> = HashMap::new();
        for req in reqs {
            for (interval, &min) in &req.min_candles {
                merged
                    .entry(interval.clone())
                    .and_modify(|existing| *existing = (*existing).max(min))
                    .or_insert(min);
            }
        }
        ModuleRequirements { min_candles: merged }
    }
}

/// Event envelope routed through the event bus.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub producer_timestamp: UnixMillis,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            producer_timestamp: UnixMillis::now(),
        }
    }
}

/// The payload carried by an [`Event`].
#[derive(Debug, Clone)]
pub enum EventKind {
    CandleUpdate(Candle),
    CandleClosed(Candle),
    SignalGenerated(Signal),
    OrderPlaced(Order),
    OrderPartiallyFilled(Order),
    OrderFilled(Order),
    OrderCanceled(Order),
    PositionUpdate(Position),
    /// Emitted by [`crate::streamers::user::PrivateUserStreamer`] after a
    /// reconnect, telling the engine its position/order caches may be
    /// stale and must be refreshed via REST before being trusted again.
    ResyncRequested { symbol: String },
    ShutdownRequested,
}

impl EventKind {
    /// The logical queue this event kind belongs to.
    pub fn queue(&self) -> crate::bus::QueueKind {
        match self {
            EventKind::CandleUpdate(_) | EventKind::CandleClosed(_) => crate::bus::QueueKind::Data,
            EventKind::SignalGenerated(_) => crate::bus::QueueKind::Signal,
            EventKind::OrderPlaced(_)
            | EventKind::OrderPartiallyFilled(_)
            | EventKind::OrderFilled(_)
            | EventKind::OrderCanceled(_)
            | EventKind::PositionUpdate(_)
            | EventKind::ResyncRequested { .. } => crate::bus::QueueKind::Order,
            EventKind::ShutdownRequested => crate::bus::QueueKind::Order,
        }
    }
}

/// Liquidation state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationState {
    Idle,
    InProgress,
    Completed,
    Partial,
    Failed,
    Skipped,
}

/// Outcome of an [`crate::liquidation::LiquidationManager::execute_liquidation`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub state: LiquidationState,
    pub positions_closed: u32,
    pub positions_failed: u32,
    pub orders_canceled: u32,
    pub orders_failed: u32,
    pub duration_secs: f64,
    pub error_message: Option<String>,
}

impl LiquidationResult {
    pub fn is_success(&self) -> bool {
        self.state == LiquidationState::Completed && self.positions_failed == 0 && self.orders_failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn candle_rejects_low_above_extremes() {
        let err = Candle::new(
            "BTCUSDT",
            "5m",
            UnixMillis(0),
            UnixMillis(1),
            dec!(100),
            dec!(101),
            dec!(100.5),
            dec!(100.2),
            dec!(10),
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::core::errors::ValidationError::BadOhlcBounds { .. }
        ));
    }

    #[test]
    fn candle_accepts_valid_bounds() {
        let candle = Candle::new(
            "BTCUSDT",
            "5m",
            UnixMillis(0),
            UnixMillis(1),
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100.5),
            dec!(10),
            true,
        )
        .unwrap();
        assert_eq!(candle.low, dec!(99));
    }

    #[test]
    fn long_entry_tp_sl_ordering() {
        let signal = Signal {
            kind: SignalKind::LongEntry,
            symbol: "BTCUSDT".into(),
            entry_price: dec!(100),
            take_profit: Some(dec!(110)),
            stop_loss: Some(dec!(95)),
            strategy_name: "ict".into(),
            timestamp: UnixMillis(0),
            confidence: 0.8,
            exit_reason: None,
            metadata: HashMap::new(),
        };
        assert!(signal.validate_tp_sl_ordering().is_ok());
        assert_eq!(signal.risk_reward_ratio().unwrap(), dec!(2));
    }

    #[test]
    fn short_entry_wrong_side_is_rejected() {
        let signal = Signal {
            kind: SignalKind::ShortEntry,
            symbol: "BTCUSDT".into(),
            entry_price: dec!(100),
            take_profit: Some(dec!(110)),
            stop_loss: Some(dec!(95)),
            strategy_name: "ict".into(),
            timestamp: UnixMillis(0),
            confidence: 0.8,
            exit_reason: None,
            metadata: HashMap::new(),
        };
        assert!(signal.validate_tp_sl_ordering().is_err());
    }

    #[test]
    fn module_requirements_merge_takes_union_and_max() {
        let a = ModuleRequirements::single("5m", 50);
        let b = ModuleRequirements::single("5m", 200);
        let c = ModuleRequirements::single("1h", 50);
        let merged = ModuleRequirements::merge([&a, &b, &c]);
        assert_eq!(merged.min_candles.get("5m"), Some(&200));
        assert_eq!(merged.min_candles.get("1h"), Some(&50));
    }
}
