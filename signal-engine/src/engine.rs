//! Strategy Engine (C5, §4.5): loads strategies from the catalog, owns the
//! warmup/cooldown/dedup bookkeeping, drives per-candle evaluation through
//! the registered [`Strategy`] instances, and persists/fans-out/forwards
//! every emitted signal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::{Mutex as SyncMutex, RwLock};
use signal_core::{
    strategy_symbol_key, strategy_symbol_timeframe_key, symbol_timeframe_key, Candle, EngineError,
    HistoryBar, Signal, TradingMode,
};
use signal_store::{BarSource, HistoryStore, SignalStore, StrategyCatalog};
use signal_strategy::{create_strategy, Strategy};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::bookkeeping::Bookkeeping;
use crate::forwarder::ExecutionForwarder;
use crate::hub::SubscriberHub;
use crate::planner::{self, SubscriptionPlan};

/// The spec (§4.5 gate 7) fetches `max(200, init_periods, lookback_bars)`
/// bars but never defines `lookback_bars` independently of a strategy's
/// declared `init_periods` — the `Strategy` contract (§4.4) exposes no such
/// field. Resolved as a fixed engine-level floor on the history window
/// fetched per evaluation, folding `lookback_bars` into the `200` constant
/// rather than inventing an unspecified per-strategy knob (see DESIGN.md).
const MIN_HISTORY_WINDOW: usize = 200;

struct RegisteredStrategy {
    id: String,
    version: String,
    symbols: Vec<String>,
    timeframes: Vec<String>,
    mode: TradingMode,
    init_periods: u32,
    strategy: AsyncMutex<Box<dyn Strategy>>,
}

struct WarmupEntry {
    complete: bool,
}

/// Instances plus their warmup completion flags, swapped in wholesale by
/// `initialize`/`reload_strategies` (I1). Candles already mid-evaluation
/// keep using the snapshot they grabbed at the start of `process_candle`.
struct EngineState {
    instances: Vec<Arc<RegisteredStrategy>>,
    warmup: SyncMutex<HashMap<String, WarmupEntry>>,
}

pub struct StrategyEngine {
    catalog: StrategyCatalog,
    history: HistoryStore,
    signal_store: SignalStore,
    hub: Arc<SubscriberHub>,
    forwarder: Arc<ExecutionForwarder>,
    mode_filter: Option<TradingMode>,
    cooldown: ChronoDuration,
    book: Bookkeeping,
    state: RwLock<Arc<EngineState>>,
}

impl StrategyEngine {
    pub fn new(
        catalog: StrategyCatalog,
        history: HistoryStore,
        signal_store: SignalStore,
        hub: Arc<SubscriberHub>,
        forwarder: Arc<ExecutionForwarder>,
        mode_filter: Option<TradingMode>,
        cooldown_minutes: i64,
    ) -> Self {
        StrategyEngine {
            catalog,
            history,
            signal_store,
            hub,
            forwarder,
            mode_filter,
            cooldown: ChronoDuration::minutes(cooldown_minutes),
            book: Bookkeeping::new(),
            state: RwLock::new(Arc::new(EngineState {
                instances: Vec::new(),
                warmup: SyncMutex::new(HashMap::new()),
            })),
        }
    }

    /// Loads active strategies, builds instances, records startup-gate
    /// cutoffs, and pre-checks warmup (4.5.1-4.5.4). Fatal on any catalog
    /// failure or if no instance could be built (§7).
    pub async fn initialize(&self) -> Result<(), EngineError> {
        self.rebuild().await
    }

    /// Re-runs steps 1-4 of `initialize()`, clearing `warmup_*` and the live
    /// instance map. Candles already mid-evaluation keep their already-taken
    /// snapshot (the old `Arc<EngineState>` lives until they finish).
    pub async fn reload_strategies(&self) -> Result<(), EngineError> {
        self.rebuild().await
    }

    async fn rebuild(&self) -> Result<(), EngineError> {
        let rows = self.catalog.load_active(self.mode_filter).await?;
        if rows.is_empty() {
            return Err(EngineError::NoActiveStrategies);
        }

        let mut instances = Vec::with_capacity(rows.len());
        let mut warmup = HashMap::new();

        for config in &rows {
            let strategy = match create_strategy(config) {
                Ok(strategy) => strategy,
                Err(EngineError::UnknownStrategy(name)) => {
                    warn!(strategy = %name, "unknown strategy in catalog row, skipping");
                    continue;
                }
                Err(other) => return Err(other),
            };

            let id = strategy.id().to_string();
            let version = strategy.version().to_string();
            for symbol in &config.symbols {
                for timeframe in &config.timeframes {
                    let key = strategy_symbol_timeframe_key(&id, symbol, timeframe);
                    warmup.insert(
                        key,
                        WarmupEntry {
                            complete: config.init_periods == 0,
                        },
                    );
                }
            }

            instances.push(Arc::new(RegisteredStrategy {
                id,
                version,
                symbols: config.symbols.clone(),
                timeframes: config.timeframes.clone(),
                mode: config.mode,
                init_periods: config.init_periods,
                strategy: AsyncMutex::new(strategy),
            }));
        }

        if instances.is_empty() {
            return Err(EngineError::NoActiveStrategies);
        }

        let mut pairs: HashSet<(String, String)> = HashSet::new();
        for inst in &instances {
            for symbol in &inst.symbols {
                for timeframe in &inst.timeframes {
                    pairs.insert((symbol.clone(), timeframe.clone()));
                }
            }
        }
        for (symbol, timeframe) in &pairs {
            if let Some(ts) = self
                .history
                .max_timestamp(symbol.clone(), timeframe.clone())
                .await?
            {
                self.book
                    .set_startup_latest_ts(symbol_timeframe_key(symbol, timeframe), ts);
            }
        }

        for inst in &instances {
            for symbol in &inst.symbols {
                for timeframe in &inst.timeframes {
                    let bars_needed = (inst.init_periods as usize).max(MIN_HISTORY_WINDOW);
                    let history = self
                        .history
                        .fetch(symbol.clone(), timeframe.clone(), bars_needed, BarSource::Primary)
                        .await?;
                    if history.len() >= inst.init_periods as usize {
                        let key = strategy_symbol_timeframe_key(&inst.id, symbol, timeframe);
                        if let Some(entry) = warmup.get_mut(&key) {
                            entry.complete = true;
                        }
                    }
                }
            }
        }

        let instance_count = instances.len();
        *self.state.write() = Arc::new(EngineState {
            instances,
            warmup: SyncMutex::new(warmup),
        });
        info!(instances = instance_count, "strategy engine (re)initialized");
        Ok(())
    }

    /// The set of upstream `(timeframe -> symbols)` subscriptions C9 must
    /// open for the currently-registered instances (C8).
    pub fn required_subscriptions(&self) -> Result<SubscriptionPlan, EngineError> {
        let snapshot = self.state.read().clone();
        let plan = planner::plan_from_instances(
            snapshot
                .instances
                .iter()
                .map(|inst| (inst.timeframes.as_slice(), inst.symbols.as_slice())),
        );
        planner::require_non_empty(plan)
    }

    /// Drives one candle through every registered instance in registration
    /// order, applying the gates of §4.5 and stopping at the first emission
    /// (the deliberate tie-break throttle). Returns the emitted signal, if
    /// any; persistence (I2) always completes before broadcast/forwarding
    /// are kicked off.
    pub async fn process_candle(&self, candle: Candle) -> Option<Signal> {
        let snapshot = self.state.read().clone();

        for reg in snapshot.instances.iter() {
            if !reg.symbols.iter().any(|s| s == &candle.symbol) {
                continue;
            }
            if !reg.timeframes.iter().any(|t| t == &candle.timeframe) {
                continue;
            }

            let stf_key = strategy_symbol_timeframe_key(&reg.id, &candle.symbol, &candle.timeframe);
            let ss_key = strategy_symbol_key(&reg.id, &candle.symbol);
            let st_key = symbol_timeframe_key(&candle.symbol, &candle.timeframe);

            {
                let guard = reg.strategy.lock().await;
                if guard.session_rejects(&candle) {
                    debug!(strategy_id = %reg.id, symbol = %candle.symbol, "outside session window, skipping");
                    continue;
                }
            }

            // §4.5 gate 2: a candle with no parseable timestamp skips the
            // gates that need one (startup cutoff, de-duplication) rather
            // than being rejected outright.
            if let Some(ts) = candle.timestamp {
                if self.book.startup_rejects(&st_key, ts) {
                    debug!(symbol = %candle.symbol, timeframe = %candle.timeframe, "candle at or before startup cutoff, skipping");
                    continue;
                }

                if self.book.dedup_gate(&stf_key, ts) {
                    debug!(strategy_id = %reg.id, symbol = %candle.symbol, "non-increasing candle timestamp, skipping");
                    continue;
                }
            }

            let now = Utc::now();
            if self.book.cooldown_rejects(&ss_key, now, self.cooldown) {
                debug!(strategy_id = %reg.id, symbol = %candle.symbol, "cooldown active, skipping");
                continue;
            }

            let bars_needed = (reg.init_periods as usize).max(MIN_HISTORY_WINDOW);
            let history = match self
                .history
                .fetch(candle.symbol.clone(), candle.timeframe.clone(), bars_needed, BarSource::Primary)
                .await
            {
                Ok(history) => history,
                Err(err) => {
                    warn!(error = %err, strategy_id = %reg.id, "history store unavailable, skipping candle");
                    continue;
                }
            };

            if history.len() < reg.init_periods as usize {
                debug!(strategy_id = %reg.id, symbol = %candle.symbol, bars = history.len(), "warmup pending");
                continue;
            }
            if let Some(entry) = snapshot.warmup.lock().get_mut(&stf_key) {
                entry.complete = true;
            }

            let history_bars: Vec<HistoryBar> = history.iter().map(HistoryBar::from).collect();

            let maybe_signal = {
                let mut guard = reg.strategy.lock().await;
                let candle_ref = &candle;
                let history_ref = &history_bars;
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    guard.on_candle(candle_ref, history_ref)
                })) {
                    Ok(signal) => signal,
                    Err(_) => {
                        error!(strategy_id = %reg.id, symbol = %candle.symbol, "strategy evaluation panicked, treating as no signal");
                        None
                    }
                }
            };

            let mut signal = match maybe_signal {
                Some(signal) => signal,
                None => continue,
            };

            signal.strategy_id = reg.id.clone();
            signal.strategy_version = reg.version.clone();
            signal.symbol = candle.symbol.clone();
            signal.timeframe = candle.timeframe.clone();
            signal
                .meta
                .entry("mode".to_string())
                .or_insert_with(|| reg.mode.as_str().to_string());

            self.book.record_signal(ss_key, now);

            if let Err(err) = self.signal_store.persist(signal.clone(), reg.mode).await {
                error!(error = %err, strategy_id = %reg.id, "signal store unavailable, dropping forwarding/broadcast (I2)");
                return None;
            }

            // I2: persistence above completed before either fan-out path
            // below can run. Broadcast never blocks (§4.7); the forwarder's
            // RPC does, so it is backgrounded per 4.5.12.
            self.hub.broadcast(&signal);

            let forwarder = self.forwarder.clone();
            let forward_signal = signal.clone();
            let mode = reg.mode;
            tokio::spawn(async move {
                if let Err(err) = forwarder.execute(&forward_signal, mode).await {
                    warn!(error = %err, "execution forwarding ultimately failed");
                }
            });

            return Some(signal);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarder::ExecutionForwarder;
    use crate::hub::SubscriberHub;
    use crate::limiter::RateLimiter;
    use async_trait::async_trait;
    use governor::Quota;
    use nonzero_ext::nonzero;
    use rust_decimal::Decimal;
    use signal_core::{PositionSide, SignalSide, StrategyStatus};
    use signal_rpc::client::ExecutionClient;
    use signal_rpc::error::RpcError;
    use signal_rpc::proto::{OrderRequest, OrderStatus};
    use signal_store::Catalog;
    use signal_strategy::{register_strategy, EntryDecision, ExitDecision, StrategyLogic};
    use std::str::FromStr;
    use uuid::Uuid;

    struct AlwaysLong;

    impl StrategyLogic for AlwaysLong {
        fn build(_config: &signal_core::StrategyConfig) -> Result<Self, EngineError> {
            Ok(AlwaysLong)
        }

        fn min_bars(&self) -> usize {
            0
        }

        fn evaluate_entry(
            &mut self,
            candle: &Candle,
            _history: &[HistoryBar],
        ) -> Option<EntryDecision> {
            Some(EntryDecision {
                side: PositionSide::Long,
                price: candle.close,
                confidence: 0.9,
            })
        }

        fn evaluate_exit(
            &mut self,
            candle: &Candle,
            _history: &[HistoryBar],
            _position: &signal_core::Position,
        ) -> Option<ExitDecision> {
            Some(ExitDecision {
                price: candle.close,
                confidence: 0.5,
                reason: "regime_reversal".to_string(),
            })
        }
    }

    register_strategy!(AlwaysLong, "EngineTestAlwaysLong");

    struct NoopExecutionClient;

    #[async_trait]
    impl ExecutionClient for NoopExecutionClient {
        async fn execute_signal(&mut self, request: OrderRequest) -> Result<OrderStatus, RpcError> {
            Ok(OrderStatus {
                signal_id: request.signal_id,
                accepted: true,
                message: String::new(),
            })
        }
    }

    fn candle(symbol: &str, timeframe: &str, ts: chrono::DateTime<Utc>, close: &str) -> Candle {
        Candle {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            timestamp: Some(ts),
            open: Decimal::from_str(close).unwrap(),
            high: Decimal::from_str(close).unwrap(),
            low: Decimal::from_str(close).unwrap(),
            close: Decimal::from_str(close).unwrap(),
            volume: Decimal::ONE,
            count: 1,
        }
    }

    fn sample_config(init_periods: u32) -> signal_core::StrategyConfig {
        signal_core::StrategyConfig {
            id: Uuid::new_v4(),
            name: "EngineTestAlwaysLong".to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({}),
            symbols: vec!["BTCUSDT".to_string()],
            timeframes: vec!["5m".to_string()],
            mode: TradingMode::Paper,
            init_periods,
            status: StrategyStatus::Active,
            is_live: false,
        }
    }

    fn test_forwarder() -> Arc<ExecutionForwarder> {
        Arc::new(ExecutionForwarder::new(
            Box::new(NoopExecutionClient),
            RateLimiter::new(Quota::per_second(nonzero!(1000u32))),
        ))
    }

    async fn build_engine(dir: &tempfile::TempDir, init_periods: u32) -> StrategyEngine {
        let catalog = Catalog::open(dir.path().join("catalog.db")).unwrap();
        {
            let conn = catalog.connect().unwrap();
            conn.execute("INSERT INTO instruments (symbol) VALUES ('BTCUSDT')", [])
                .unwrap();
        }
        let strategy_catalog = StrategyCatalog::new(catalog.clone());
        strategy_catalog.upsert(sample_config(init_periods)).await.unwrap();

        let history = HistoryStore::new(catalog.clone());
        let signal_store = SignalStore::new(catalog.clone());
        let hub = SubscriberHub::new(crate::hub::MIN_QUEUE_BOUND);

        let engine = StrategyEngine::new(
            StrategyCatalog::new(catalog),
            history,
            signal_store,
            hub,
            test_forwarder(),
            None,
            15,
        );
        engine.initialize().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn emits_entry_then_exit_never_a_second_entry() {
        let dir = tempfile::tempdir().unwrap();
        let engine = build_engine(&dir, 0).await;

        let t0 = Utc::now();
        let first = engine
            .process_candle(candle("BTCUSDT", "5m", t0, "100"))
            .await
            .unwrap();
        assert_eq!(first.side, SignalSide::Long);
        assert!(!first.is_exit());

        // Cooldown (15 min default) should suppress a same-minute second
        // candle from producing another signal.
        let t1 = t0 + chrono::Duration::seconds(30);
        let second = engine.process_candle(candle("BTCUSDT", "5m", t1, "101")).await;
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn startup_gate_suppresses_historical_candles() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("catalog.db")).unwrap();
        {
            let conn = catalog.connect().unwrap();
            conn.execute("INSERT INTO instruments (symbol) VALUES ('BTCUSDT')", [])
                .unwrap();
            conn.execute(
                "INSERT INTO ohlcs (instrument_id, timeframe, ts, open, high, low, close, volume, count)
                 VALUES (1, '5m', '2025-01-01T12:00:00Z', '1', '1', '1', '1', '1', 1)",
                [],
            )
            .unwrap();
        }
        let strategy_catalog = StrategyCatalog::new(catalog.clone());
        strategy_catalog.upsert(sample_config(0)).await.unwrap();

        let history = HistoryStore::new(catalog.clone());
        let signal_store = SignalStore::new(catalog.clone());
        let hub = SubscriberHub::new(crate::hub::MIN_QUEUE_BOUND);
        let engine = StrategyEngine::new(strategy_catalog, history, signal_store, hub, test_forwarder(), None, 15);
        engine.initialize().await.unwrap();

        let historical = candle(
            "BTCUSDT",
            "5m",
            "2025-01-01T11:55:00Z".parse().unwrap(),
            "100",
        );
        assert!(engine.process_candle(historical).await.is_none());

        let fresh = candle("BTCUSDT", "5m", "2025-01-01T12:05:00Z".parse().unwrap(), "100");
        assert!(engine.process_candle(fresh).await.is_some());
    }

    #[tokio::test]
    async fn candle_with_no_timestamp_still_emits() {
        let dir = tempfile::tempdir().unwrap();
        let engine = build_engine(&dir, 0).await;

        let mut no_ts = candle("BTCUSDT", "5m", Utc::now(), "100");
        no_ts.timestamp = None;
        let signal = engine.process_candle(no_ts).await.unwrap();
        assert_eq!(signal.side, SignalSide::Long);
    }
}
