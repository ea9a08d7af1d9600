//! The object-safe `Strategy` contract the engine drives (C4), and the
//! generic scaffolding wrapper that gives every [`crate::logic::StrategyLogic`]
//! the insufficient-data guard, session filter, and position discipline
//! required by §4.4 without duplicating them per strategy.

use std::collections::HashMap;

use chrono::Utc;
use signal_core::{Candle, HistoryBar, Position, Signal, SignalSide, StrategyConfig, TradingMode};
use tracing::debug;

use crate::logic::StrategyLogic;

/// The contract the engine (C5) drives per registered instance.
pub trait Strategy: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn symbols(&self) -> &[String];
    fn timeframes(&self) -> &[String];
    fn mode(&self) -> TradingMode;
    fn init_periods(&self) -> u32;

    /// The engine's gate-3 session check (§4.5): true when `candle` falls
    /// outside this instance's declared session window. Instances with no
    /// session window never reject.
    fn session_rejects(&self, candle: &Candle) -> bool;

    /// Evaluates one candle against the current position state for
    /// `candle.symbol`. `history` excludes `candle` itself and is never
    /// mutated. Returns at most one [`Signal`].
    fn on_candle(&mut self, candle: &Candle, history: &[HistoryBar]) -> Option<Signal>;
}

/// Wraps a [`StrategyLogic`] with the shared scaffolding every concrete
/// strategy must exhibit per §4.4: a minimum-history guard, an optional
/// session-time filter, and position discipline (no second entry before an
/// exit is emitted).
pub struct StrategyInstance<T> {
    id: String,
    name: String,
    version: String,
    symbols: Vec<String>,
    timeframes: Vec<String>,
    mode: TradingMode,
    init_periods: u32,
    position_state: HashMap<String, Position>,
    logic: T,
}

impl<T> StrategyInstance<T>
where
    T: StrategyLogic,
{
    pub fn new(config: &StrategyConfig, logic: T) -> Self {
        StrategyInstance {
            id: config.id.to_string(),
            name: config.name.clone(),
            version: config.version.clone(),
            symbols: config.symbols.clone(),
            timeframes: config.timeframes.clone(),
            mode: config.mode,
            init_periods: config.init_periods,
            position_state: HashMap::new(),
            logic,
        }
    }

    /// A candle with no parseable timestamp trivially passes the session
    /// check (§4.5 gate 2 skips gates that require a timestamp).
    fn session_rejects(&self, candle: &Candle) -> bool {
        match (self.logic.session(), candle.timestamp) {
            (Some((start, end)), Some(ts)) => {
                let time = ts.time();
                time < start || time > end
            }
            _ => false,
        }
    }
}

impl<T> Strategy for StrategyInstance<T>
where
    T: StrategyLogic,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn timeframes(&self) -> &[String] {
        &self.timeframes
    }

    fn mode(&self) -> TradingMode {
        self.mode
    }

    fn init_periods(&self) -> u32 {
        self.init_periods
    }

    fn session_rejects(&self, candle: &Candle) -> bool {
        StrategyInstance::session_rejects(self, candle)
    }

    fn on_candle(&mut self, candle: &Candle, history: &[HistoryBar]) -> Option<Signal> {
        if history.len() < self.logic.min_bars() {
            debug!(strategy = %self.name, symbol = %candle.symbol, "insufficient history, skipping");
            return None;
        }

        if self.session_rejects(candle) {
            debug!(strategy = %self.name, symbol = %candle.symbol, "outside session window, skipping");
            return None;
        }

        if let Some(position) = self.position_state.get(&candle.symbol).cloned() {
            let exit = self.logic.evaluate_exit(candle, history, &position)?;
            self.position_state.remove(&candle.symbol);
            let side = position.side.exit_side();
            return Some(build_exit_signal(side, exit));
        }

        let entry = self.logic.evaluate_entry(candle, history)?;
        self.position_state.insert(
            candle.symbol.clone(),
            Position::new(entry.side, entry.price, candle.timestamp.unwrap_or_else(Utc::now), None),
        );
        Some(build_entry_signal(entry))
    }
}

fn build_entry_signal(entry: crate::logic::EntryDecision) -> Signal {
    let side = match entry.side {
        signal_core::PositionSide::Long => SignalSide::Long,
        signal_core::PositionSide::Short => SignalSide::Short,
    };
    Signal::entry(side, entry.price, entry.confidence)
}

fn build_exit_signal(side: SignalSide, exit: crate::logic::ExitDecision) -> Signal {
    Signal::exit(side, exit.price, exit.confidence, exit.reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{EntryDecision, ExitDecision};
    use rust_decimal::Decimal;
    use signal_core::{EngineError, PositionSide, StrategyStatus};
    use std::str::FromStr;
    use uuid::Uuid;

    struct ScriptedLogic {
        min_bars: usize,
        entry_once: bool,
    }

    impl StrategyLogic for ScriptedLogic {
        fn build(_config: &StrategyConfig) -> Result<Self, EngineError> {
            Ok(ScriptedLogic {
                min_bars: 1,
                entry_once: true,
            })
        }

        fn min_bars(&self) -> usize {
            self.min_bars
        }

        fn evaluate_entry(&mut self, candle: &Candle, _history: &[HistoryBar]) -> Option<EntryDecision> {
            if self.entry_once {
                self.entry_once = false;
                Some(EntryDecision {
                    side: PositionSide::Long,
                    price: candle.close,
                    confidence: 0.9,
                })
            } else {
                None
            }
        }

        fn evaluate_exit(
            &mut self,
            candle: &Candle,
            _history: &[HistoryBar],
            _position: &Position,
        ) -> Option<ExitDecision> {
            Some(ExitDecision {
                price: candle.close,
                confidence: 0.5,
                reason: "regime_reversal".to_string(),
            })
        }
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            id: Uuid::new_v4(),
            name: "scripted".to_string(),
            version: "1.0.0".to_string(),
            params: serde_json::json!({}),
            symbols: vec!["BTCUSDT".to_string()],
            timeframes: vec!["5m".to_string()],
            mode: TradingMode::Paper,
            init_periods: 0,
            status: StrategyStatus::Active,
            is_live: false,
        }
    }

    fn candle(close: &str) -> Candle {
        Candle {
            symbol: "BTCUSDT".to_string(),
            timeframe: "5m".to_string(),
            timestamp: Some(Utc::now()),
            open: Decimal::from_str(close).unwrap(),
            high: Decimal::from_str(close).unwrap(),
            low: Decimal::from_str(close).unwrap(),
            close: Decimal::from_str(close).unwrap(),
            volume: Decimal::ONE,
            count: 1,
        }
    }

    fn bar() -> HistoryBar {
        HistoryBar {
            timestamp: Utc::now(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            count: 1,
        }
    }

    #[test]
    fn never_emits_second_entry_before_exit() {
        let logic = ScriptedLogic {
            min_bars: 1,
            entry_once: true,
        };
        let mut instance = StrategyInstance::new(&config(), logic);
        let history = vec![bar()];

        let first = instance.on_candle(&candle("100"), &history).unwrap();
        assert_eq!(first.side, SignalSide::Long);
        assert!(!first.is_exit());

        let second = instance.on_candle(&candle("101"), &history).unwrap();
        assert!(second.is_exit());
        assert_eq!(second.side, SignalSide::Short);
    }

    #[test]
    fn insufficient_history_returns_none() {
        let logic = ScriptedLogic {
            min_bars: 5,
            entry_once: true,
        };
        let mut instance = StrategyInstance::new(&config(), logic);
        assert!(instance.on_candle(&candle("100"), &[bar()]).is_none());
    }
}
