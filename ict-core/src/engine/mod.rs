//! The trading engine: lifecycle, event routing, and the ordered handler
//! chain that turns closed candles into signals, signals into orders, and
//! order fills into tracked PnL. Single cooperative runtime: streamers
//! schedule work onto it but never run business logic themselves.
//!
//! `position_reconciliation` ports a fixed-point `PositionReconciler` to
//! `Decimal`; the engine invokes it on a fill-count cadence to catch
//! position-cache drift against the exchange.

pub mod position_reconciliation;

use crate::audit::{AuditEventType, AuditFields, AuditLogger};
use crate::bus::{EventBus, QueueKind};
use crate::config::types::{Config, SymbolConfig};
use crate::core::errors::ConfigurationError;
use crate::core::types::{Event, EventKind, MarginType, Order, Position, PositionEntryData, PositionSide, Signal};
use crate::execution::OrderGateway;
use crate::indicator_cache::IndicatorStateCache;
use crate::liquidation::LiquidationManager;
use crate::position::PositionCache;
use crate::risk::types::{AccountState, SymbolFilters};
use crate::risk::RiskGuard;
use crate::strategy::buffers::SymbolBuffers;
use crate::strategy::ComposableStrategy;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Engine lifecycle. Backed by an atomic so the hot ingress path (candle
/// arrival from a streamer task) can check it without a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Created = 0,
    Initialized = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => EngineState::Created,
            1 => EngineState::Initialized,
            2 => EngineState::Running,
            3 => EngineState::Stopping,
            _ => EngineState::Stopped,
        }
    }
}

struct AtomicEngineState(AtomicU8);

impl AtomicEngineState {
    fn new(state: EngineState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: EngineState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Bookkeeping the engine needs per symbol: candle history, the entry data
/// of the currently open position (for PnL on close), and a same-interval
/// dedup of the last candle processed.
#[derive(Default)]
struct SymbolState {
    buffers: SymbolBuffers,
    entry_data: Option<PositionEntryData>,
}

/// Tracks the trading day's starting equity so the risk guard can compute a
/// daily-loss percentage; resets when the wall-clock day rolls over.
struct DailyStats {
    day: Mutex<Option<chrono::NaiveDate>>,
    starting_equity: Mutex<Decimal>,
    realized_pnl: Mutex<Decimal>,
}

impl DailyStats {
    fn new() -> Self {
        Self {
            day: Mutex::new(None),
            starting_equity: Mutex::new(Decimal::ZERO),
            realized_pnl: Mutex::new(Decimal::ZERO),
        }
    }

    fn roll_if_needed(&self, equity: Decimal) {
        let today = chrono::Utc::now().date_naive();
        let mut day = self.day.lock();
        if *day != Some(today) {
            *day = Some(today);
            *self.starting_equity.lock() = equity;
            *self.realized_pnl.lock() = Decimal::ZERO;
        }
    }

    fn record_realized(&self, pnl: Decimal) {
        *self.realized_pnl.lock() += pnl;
    }

    fn snapshot(&self) -> (Decimal, Decimal) {
        (*self.starting_equity.lock(), *self.realized_pnl.lock())
    }
}

/// Wires together every subsystem and drives the event bus. One instance
/// per running binary; `ict-bins` owns construction and the `run` call.
pub struct TradeCoordinator {
    state: AtomicEngineState,
    config: Config,
    bus: EventBus,
    strategy: ComposableStrategy,
    risk: RiskGuard,
    gateway: Arc<dyn OrderGateway>,
    positions: PositionCache,
    indicators: IndicatorStateCache,
    audit: Option<Arc<AuditLogger>>,
    liquidation: LiquidationManager,
    symbols: DashMap<String, Mutex<SymbolState>>,
    daily: DailyStats,
    reconciler: position_reconciliation::PositionReconciler,
}

impl TradeCoordinator {
    pub fn new(
        config: Config,
        strategy: ComposableStrategy,
        gateway: Arc<dyn OrderGateway>,
        audit: Option<Arc<AuditLogger>>,
    ) -> Self {
        let bus = EventBus::new(config.bus.queue_capacity);
        let risk = RiskGuard::new(config.risk.clone());
        let liquidation = LiquidationManager::new(config.liquidation.clone(), gateway.clone(), audit.clone());
        let indicators = IndicatorStateCache::with_expiry(
            config.strategy.max_order_blocks,
            config.strategy.max_fair_value_gaps,
            config.strategy.indicator_expiry_candles,
        );
        let symbols = DashMap::new();
        for s in &config.symbols {
            symbols.insert(s.symbol.clone(), Mutex::new(SymbolState::default()));
        }
        Self {
            state: AtomicEngineState::new(EngineState::Created),
            config,
            bus,
            strategy,
            risk,
            gateway,
            positions: PositionCache::new(),
            indicators,
            audit,
            liquidation,
            symbols,
            daily: DailyStats::new(),
            reconciler: position_reconciliation::PositionReconciler::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn positions(&self) -> &PositionCache {
        &self.positions
    }

    /// CREATED → INITIALIZED: validate every symbol is configured with an
    /// interval the strategy can actually use, then set leverage/margin
    /// type per symbol. Any failure here is fatal.
    pub async fn initialize_components(&self) -> Result<(), ConfigurationError> {
        if self.state.get() != EngineState::Created {
            return Err(ConfigurationError::Conflict {
                reason: format!("initialize_components called from state {:?}", self.state.get()),
            });
        }

        let requirements = self.strategy.requirements();
        for symbol in &self.config.symbols {
            let declared: Vec<&str> = symbol
                .extra_intervals
                .iter()
                .map(String::as_str)
                .chain(requirements.min_candles.keys().map(String::as_str))
                .collect();
            if requirements.min_candles.keys().any(|interval| !declared.contains(&interval.as_str())) {
                return Err(ConfigurationError::Conflict {
                    reason: format!("{}: strategy requires an interval not subscribed", symbol.symbol),
                });
            }

            self.gateway
                .set_leverage(&symbol.symbol, symbol.max_leverage)
                .await
                .map_err(|e| ConfigurationError::Conflict { reason: format!("{}: set_leverage failed: {e}", symbol.symbol) })?;
            self.gateway
                .set_margin_type(&symbol.symbol, MarginType::Isolated)
                .await
                .map_err(|e| ConfigurationError::Conflict { reason: format!("{}: set_margin_type failed: {e}", symbol.symbol) })?;

            if let Some(entry) = self.symbols.get(&symbol.symbol) {
                let mut state = entry.lock();
                for (interval, &min_candles) in &requirements.min_candles {
                    state.buffers.ensure_interval(interval, min_candles);
                }
            }
        }

        self.state.set(EngineState::Initialized);
        info!(symbols = self.config.symbols.len(), "engine initialized");
        Ok(())
    }

    /// INITIALIZED → RUNNING → (blocks draining the bus until shutdown is
    /// requested) → STOPPING → STOPPED.
    pub async fn run(&self) -> Result<(), ConfigurationError> {
        if self.state.get() != EngineState::Initialized {
            return Err(ConfigurationError::Conflict {
                reason: format!("run called from state {:?}", self.state.get()),
            });
        }

        let mut data_rx = self.bus.take_receiver(QueueKind::Data).expect("data receiver taken once");
        let mut signal_rx = self.bus.take_receiver(QueueKind::Signal).expect("signal receiver taken once");
        let mut order_rx = self.bus.take_receiver(QueueKind::Order).expect("order receiver taken once");

        self.state.set(EngineState::Running);
        info!("engine running");

        loop {
            tokio::select! {
                biased;
                Some(event) = order_rx.recv() => {
                    if matches!(event.kind, EventKind::ShutdownRequested) {
                        break;
                    }
                    self.dispatch_order_event(event).await;
                }
                Some(event) = signal_rx.recv() => {
                    self.dispatch_signal_event(event).await;
                }
                Some(event) = data_rx.recv() => {
                    self.dispatch_data_event(event).await;
                }
                else => break,
            }
        }

        self.shutdown(&mut data_rx, &mut signal_rx, &mut order_rx).await;
        Ok(())
    }

    /// Request the engine stop; safe to call from a signal handler.
    pub fn request_shutdown(&self) {
        self.bus.request_shutdown();
    }

    async fn dispatch_data_event(&self, event: Event) {
        if let EventKind::CandleClosed(candle) = event.kind {
            self.on_candle_closed(candle).await;
        }
    }

    async fn dispatch_signal_event(&self, event: Event) {
        if let EventKind::SignalGenerated(signal) = event.kind {
            self.on_signal_generated(signal).await;
        }
    }

    async fn dispatch_order_event(&self, event: Event) {
        match event.kind {
            EventKind::OrderFilled(order) => self.on_order_filled(order).await,
            EventKind::OrderPartiallyFilled(order) => self.on_order_partially_filled(order),
            EventKind::ResyncRequested { symbol } => self.on_resync_requested(&symbol).await,
            EventKind::PositionUpdate(position) => self.positions.update_from_websocket(&position.symbol, Some(position)),
            _ => {}
        }
    }

    /// Accepts only closed candles for known symbols on a declared
    /// interval; routes exit-check before entry-check so a candle can never
    /// open a new position in the same pass it would have closed one.
    /// Entry-vs-exit routing reads the position cache, not local memory: if
    /// the cache is stale a refresh is attempted, and if it's still stale
    /// afterward (the exchange itself is unreachable) the candle is skipped
    /// entirely — no entry, no exit — since neither decision can be trusted
    /// without knowing whether a position currently exists.
    pub async fn on_candle_closed(&self, candle: crate::core::types::Candle) {
        if self.state.get() != EngineState::Running {
            if matches!(self.state.get(), EngineState::Stopping | EngineState::Stopped) {
                debug!(symbol = %candle.symbol, "candle dropped: engine is stopping");
            } else {
                warn!(symbol = %candle.symbol, state = ?self.state.get(), "candle dropped: engine not running");
            }
            return;
        }

        let Some(entry) = self.symbols.get(&candle.symbol) else {
            self.audit_error(&candle.symbol, "on_candle_closed", "unknown symbol");
            return;
        };

        let requirements = self.strategy.requirements();
        if !requirements.min_candles.contains_key(&candle.interval) {
            return;
        }

        let (candles, ready) = {
            let mut state = entry.lock();
            state.buffers.push_closed(&candle.interval, candle.clone());
            let ready = state.buffers.satisfies(&requirements);
            (state.buffers.snapshot(), ready)
        };
        drop(entry);
        if !ready {
            return;
        }

        if self.positions.is_stale(&candle.symbol) {
            self.reconcile_symbol(&candle.symbol).await;
            if self.positions.is_stale(&candle.symbol) {
                warn!(symbol = %candle.symbol, "position cache stale after refresh attempt, skipping candle");
                self.audit_error(&candle.symbol, "on_candle_closed", "position cache stale, skipping entry/exit analysis");
                return;
            }
        }

        if let Some(position) = self.positions.get_fresh(&candle.symbol) {
            if let Some(signal) = self.strategy.evaluate_exit(&candle.symbol, &candles, &self.indicators, &position, candle.close, candle.close_time) {
                self.bus.publish(Event::new(EventKind::SignalGenerated(signal)));
                return;
            }
        } else {
            match self.strategy.evaluate_entry(&candle.symbol, &candles, &self.indicators, candle.close_time) {
                Ok(Some(signal)) => {
                    self.bus.publish(Event::new(EventKind::SignalGenerated(signal)));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(symbol = %candle.symbol, %e, "entry signal failed validation");
                }
            }
        }
    }

    /// Risk-validate, size, execute, and audit a candidate signal.
    pub async fn on_signal_generated(&self, signal: Signal) {
        let account = match self.account_state().await {
            Ok(account) => account,
            Err(e) => {
                error!(symbol = %signal.symbol, %e, "could not fetch account balance for risk validation");
                return;
            }
        };
        self.daily.roll_if_needed(account.equity);

        let filters = self.symbol_filters(&signal.symbol);
        let Some(filters) = filters else {
            self.audit_error(&signal.symbol, "on_signal_generated", "no configured filters for symbol");
            return;
        };

        if signal.kind.is_exit() {
            let position = self.positions.get_fresh(&signal.symbol);
            match self.risk.validate_exit(&signal, position.as_ref()) {
                Ok(()) => self.execute_exit(&signal).await,
                Err(rejection) => {
                    warn!(symbol = %signal.symbol, %rejection, "exit signal rejected by risk guard");
                    self.log_audit(AuditEventType::RiskRejection, &signal.symbol, Some(serde_json::json!({ "reason": rejection.to_string() })));
                }
            }
            return;
        }

        match self.risk.validate(&signal, &account, &filters) {
            Ok(sizing) => {
                self.log_audit(AuditEventType::RiskValidation, &signal.symbol, None);
                self.log_audit(AuditEventType::PositionSizeCalculated, &signal.symbol, Some(serde_json::json!({
                    "quantity": sizing.quantity.to_string(),
                    "notional": sizing.notional.to_string(),
                })));
                if sizing.capped_by_max_position_size {
                    self.log_audit(AuditEventType::PositionSizeCapped, &signal.symbol, None);
                }
                self.execute_entry(&signal, sizing.quantity).await;
            }
            Err(rejection) => {
                warn!(symbol = %signal.symbol, %rejection, "signal rejected by risk guard");
                self.log_audit(AuditEventType::RiskRejection, &signal.symbol, Some(serde_json::json!({ "reason": rejection.to_string() })));
            }
        }
    }

    /// Places the entry, plus up to two reduce-only bracket orders (take
    /// profit, stop loss) the gateway rests alongside it from
    /// `signal.take_profit`/`signal.stop_loss`. Whichever bracket leg fills
    /// first triggers `on_order_filled`'s sibling-cancellation so the other
    /// never sits orphaned once the position is flat.
    async fn execute_entry(&self, signal: &Signal, quantity: Decimal) {
        match self.gateway.execute_signal(signal, quantity).await {
            Ok(receipt) => {
                self.bus.publish(Event::new(EventKind::OrderPlaced(receipt.order.clone())));
                self.log_audit(AuditEventType::OrderPlaced, &signal.symbol, None);
                for bracket_order in &receipt.bracket_orders {
                    self.bus.publish(Event::new(EventKind::OrderPlaced(bracket_order.clone())));
                    self.log_audit(AuditEventType::OrderPlaced, &signal.symbol, Some(serde_json::json!({
                        "bracket_order_type": format!("{:?}", bracket_order.order_type),
                        "stop_price": bracket_order.stop_price.map(|p| p.to_string()),
                    })));
                }
                if let Some(entry) = self.symbols.get(&signal.symbol) {
                    entry.lock().entry_data = Some(PositionEntryData {
                        symbol: signal.symbol.clone(),
                        side: signal.kind.position_side(),
                        entry_price: signal.entry_price,
                        quantity,
                        entry_time: signal.timestamp,
                    });
                }
                self.positions.update_from_websocket(
                    &signal.symbol,
                    Some(Position {
                        symbol: signal.symbol.clone(),
                        side: signal.kind.position_side(),
                        entry_price: signal.entry_price,
                        quantity,
                        leverage: self.config.risk.leverage,
                        unrealized_pnl: Decimal::ZERO,
                        liquidation_price: None,
                        entry_time: Some(signal.timestamp),
                    }),
                );
            }
            Err(e) => {
                error!(symbol = %signal.symbol, %e, "order execution failed");
                self.log_audit(AuditEventType::TradeExecutionFailed, &signal.symbol, Some(serde_json::json!({ "error": e.to_string() })));
            }
        }
    }

    async fn execute_exit(&self, signal: &Signal) {
        match self.gateway.execute_market_close(&signal.symbol).await {
            Ok(receipt) => {
                self.bus.publish(Event::new(EventKind::OrderFilled(receipt.order.clone())));
            }
            Err(e) => {
                error!(symbol = %signal.symbol, %e, "market close failed");
                self.log_audit(AuditEventType::TradeExecutionFailed, &signal.symbol, Some(serde_json::json!({ "error": e.to_string() })));
            }
        }
    }

    /// Logs, tracks entry data for PnL, and on a reduce-only bracket fill
    /// cancels the sibling bracket order to prevent an orphaned resting
    /// order.
    pub async fn on_order_filled(&self, order: Order) {
        self.log_audit(AuditEventType::TradeExecuted, &order.symbol, None);
        self.reconciler.on_fill();

        if order.reduce_only {
            if let Some(entry) = self.symbols.get(&order.symbol) {
                let entry_data = entry.lock().entry_data.take();
                if let Some(entry_data) = entry_data {
                    let exit_price = order.price.unwrap_or(entry_data.entry_price);
                    let pnl = match entry_data.side {
                        PositionSide::Long => (exit_price - entry_data.entry_price) * entry_data.quantity,
                        PositionSide::Short => (entry_data.entry_price - exit_price) * entry_data.quantity,
                    };
                    self.daily.record_realized(pnl);
                    self.log_audit(AuditEventType::TradeClosed, &order.symbol, Some(serde_json::json!({ "realized_pnl": pnl.to_string() })));
                }
            }
            self.positions.invalidate(&order.symbol);
            if let Err(e) = self.gateway.cancel_all_orders(&order.symbol).await {
                warn!(symbol = %order.symbol, %e, "failed to cancel sibling bracket order after fill");
            }
        }

        if self.reconciler.should_reconcile() {
            self.reconcile_symbol(&order.symbol).await;
        }
    }

    /// Adjusts tracked filled quantity on a partial fill; the entry
    /// timestamp is left untouched so PnL/holding-duration stay anchored
    /// to the first fill.
    pub fn on_order_partially_filled(&self, order: Order) {
        if let Some(entry) = self.symbols.get(&order.symbol) {
            let mut state = entry.lock();
            if let Some(entry_data) = state.entry_data.as_mut() {
                entry_data.quantity = order.filled_quantity;
            }
        }
    }

    /// A user-data stream reconnected; treat the position cache for this
    /// symbol as stale until the next reconciliation query succeeds.
    async fn on_resync_requested(&self, symbol: &str) {
        info!(symbol, "resync requested: refreshing position from exchange");
        self.reconcile_symbol(symbol).await;
    }

    async fn reconcile_symbol(&self, symbol: &str) {
        let internal_qty = self
            .symbols
            .get(symbol)
            .and_then(|e| e.lock().entry_data.clone())
            .map(|e| e.quantity)
            .unwrap_or(Decimal::ZERO);
        match self.gateway.get_position(symbol).await {
            Ok(position) => {
                let exchange_qty = position.as_ref().map(|p| p.quantity).unwrap_or(Decimal::ZERO);
                self.positions.update_from_websocket(symbol, position);
                if let Err(e) = self.reconciler.reconcile(symbol, internal_qty, exchange_qty) {
                    error!(symbol, %e, "position reconciliation failed");
                }
            }
            Err(e) => warn!(symbol, %e, "could not refresh position for reconciliation"),
        }
    }

    async fn account_state(&self) -> Result<AccountState, crate::execution::GatewayError> {
        let balance = self.gateway.get_account_balance().await?;
        let (starting_equity, realized_pnl) = self.daily.snapshot();
        Ok(AccountState {
            equity: balance.equity,
            available_balance: balance.available_balance,
            open_position_count: self.open_position_count(),
            daily_realized_pnl: realized_pnl,
            daily_starting_equity: starting_equity,
        })
    }

    fn open_position_count(&self) -> u32 {
        self.symbols
            .iter()
            .filter(|e| e.value().lock().entry_data.is_some())
            .count() as u32
    }

    fn symbol_filters(&self, symbol: &str) -> Option<SymbolFilters> {
        self.config.symbols.iter().find(|s| s.symbol == symbol).map(symbol_filters_of)
    }

    fn log_audit(&self, event_type: AuditEventType, symbol: &str, additional_data: Option<serde_json::Value>) {
        if let Some(audit) = &self.audit {
            audit.log_event(
                event_type,
                "trade_coordinator",
                AuditFields { symbol: Some(symbol.to_string()), additional_data, ..Default::default() },
            );
        }
    }

    fn audit_error(&self, symbol: &str, operation: &str, reason: &str) {
        warn!(symbol, operation, reason, "engine handler rejected event");
        self.log_audit(AuditEventType::ApiError, symbol, Some(serde_json::json!({ "operation": operation, "reason": reason })));
    }

    /// STOPPING: stop accepting new candles, drain each queue up to its
    /// budget (order queue gets the full 10s; data may be dropped sooner),
    /// flush the audit logger, then run the liquidation protocol.
    async fn shutdown(
        &self,
        data_rx: &mut tokio::sync::mpsc::Receiver<Event>,
        signal_rx: &mut tokio::sync::mpsc::Receiver<Event>,
        order_rx: &mut tokio::sync::mpsc::Receiver<Event>,
    ) {
        self.state.set(EngineState::Stopping);
        info!("engine stopping: draining queues");

        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while let Ok(event) = data_rx.try_recv() {
                self.dispatch_data_event(event).await;
            }
        })
        .await;

        let _ = tokio::time::timeout(Duration::from_secs(5), async {
            while let Ok(event) = signal_rx.try_recv() {
                self.dispatch_signal_event(event).await;
            }
        })
        .await;

        let _ = tokio::time::timeout(Duration::from_secs(10), async {
            while let Ok(event) = order_rx.try_recv() {
                if matches!(event.kind, EventKind::ShutdownRequested) {
                    continue;
                }
                self.dispatch_order_event(event).await;
            }
        })
        .await;

        let symbols: Vec<String> = self.config.symbols.iter().map(|s| s.symbol.clone()).collect();
        let result = self.liquidation.execute_liquidation(&symbols).await;
        info!(state = ?result.state, positions_closed = result.positions_closed, "liquidation protocol finished");

        self.state.set(EngineState::Stopped);
        info!("engine stopped");
    }
}

fn symbol_filters_of(symbol: &SymbolConfig) -> SymbolFilters {
    SymbolFilters {
        lot_size: symbol.lot_size,
        min_notional: symbol.min_notional,
        max_leverage: symbol.max_leverage,
        tick_size: symbol.tick_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{AuditConfig, BusConfig, ExecutionConfig, ExecutionMode, LiquidationConfig, LoggingConfig, StrategyConfig};
    use crate::execution::simulated::SimulatedGateway;
    use crate::risk::types::RiskLimits;
    use crate::strategy::{EntryContext, EntryDecision, EntryDeterminer, ExitContext, ExitDecision, ExitDeterminer, PriceContext, StopLossDeterminer, TakeProfitDeterminer};
    use crate::core::types::ModuleRequirements;
    use rust_decimal_macros::dec;

    struct NeverEnter;
    impl EntryDeterminer for NeverEnter {
        fn name(&self) -> &str { "never_enter" }
        fn requirements(&self) -> ModuleRequirements { ModuleRequirements::single("1m", 1) }
        fn decide(&self, _ctx: &EntryContext) -> EntryDecision { EntryDecision::NoEntry }
    }
    struct NeverExit;
    impl ExitDeterminer for NeverExit {
        fn name(&self) -> &str { "never_exit" }
        fn requirements(&self) -> ModuleRequirements { ModuleRequirements::single("1m", 1) }
        fn decide(&self, _ctx: &ExitContext) -> ExitDecision { ExitDecision::Hold }
    }
    struct FixedBracket(Decimal);
    impl StopLossDeterminer for FixedBracket {
        fn name(&self) -> &str { "fixed_sl" }
        fn requirements(&self) -> ModuleRequirements { ModuleRequirements::default() }
        fn compute(&self, ctx: &PriceContext) -> Decimal {
            match ctx.side { PositionSide::Long => ctx.entry_price - self.0, PositionSide::Short => ctx.entry_price + self.0 }
        }
    }
    impl TakeProfitDeterminer for FixedBracket {
        fn name(&self) -> &str { "fixed_tp" }
        fn requirements(&self) -> ModuleRequirements { ModuleRequirements::default() }
        fn compute(&self, ctx: &PriceContext) -> Decimal {
            match ctx.side { PositionSide::Long => ctx.entry_price + self.0, PositionSide::Short => ctx.entry_price - self.0 }
        }
    }

    fn test_config() -> Config {
        Config {
            symbols: vec![SymbolConfig {
                symbol: "BTCUSDT".to_string(),
                extra_intervals: vec![],
                lot_size: dec!(0.001),
                tick_size: dec!(0.01),
                min_notional: dec!(5),
                max_leverage: dec!(5),
            }],
            risk: RiskLimits::default(),
            execution: ExecutionConfig { mode: ExecutionMode::Simulated, order_confirmation_timeout_ms: 5000, starting_equity: Some(dec!(10000)) },
            strategy: StrategyConfig::default(),
            bus: BusConfig::default(),
            logging: LoggingConfig::default(),
            audit: AuditConfig { enabled: false, directory: "logs/audit".to_string() },
            liquidation: LiquidationConfig { emergency_liquidation: false, ..LiquidationConfig::default() },
            testnet: true,
        }
    }

    fn test_strategy() -> ComposableStrategy {
        ComposableStrategy {
            name: "test".to_string(),
            entry: Box::new(NeverEnter),
            stop_loss: Box::new(FixedBracket(dec!(100))),
            take_profit: Box::new(FixedBracket(dec!(200))),
            exit: Box::new(NeverExit),
        }
    }

    #[tokio::test]
    async fn initialize_sets_leverage_and_transitions_to_initialized() {
        let gateway = Arc::new(SimulatedGateway::new(dec!(10000)));
        let engine = TradeCoordinator::new(test_config(), test_strategy(), gateway, None);
        engine.initialize_components().await.unwrap();
        assert_eq!(engine.state(), EngineState::Initialized);
    }

    #[tokio::test]
    async fn candle_dropped_before_engine_is_running() {
        let gateway = Arc::new(SimulatedGateway::new(dec!(10000)));
        let engine = TradeCoordinator::new(test_config(), test_strategy(), gateway, None);
        let candle = crate::testing::helpers::flat_candle("BTCUSDT", "1m", 0, dec!(100), dec!(1));
        engine.on_candle_closed(candle).await;
        assert_eq!(engine.open_position_count(), 0);
    }

    #[tokio::test]
    async fn reentrant_initialize_is_rejected() {
        let gateway = Arc::new(SimulatedGateway::new(dec!(10000)));
        let engine = TradeCoordinator::new(test_config(), test_strategy(), gateway, None);
        engine.initialize_components().await.unwrap();
        let err = engine.initialize_components().await.unwrap_err();
        assert!(matches!(err, ConfigurationError::Conflict { .. }));
    }
}
